// Static route endpoints
//
// The router keeps every routing entry in `rest/routing`. Creation goes
// through the `static-route` sub-collection; deletion is by `_id`.

use tracing::debug;

use crate::client::RouterClient;
use crate::error::Error;
use crate::models::StaticRoute;

impl RouterClient {
    /// List every routing entry for the site, static or not.
    ///
    /// `GET /api/s/{site}/rest/routing`
    pub async fn list_static_routes(&self) -> Result<Vec<StaticRoute>, Error> {
        let url = self.site_url("rest/routing")?;
        let routes: Vec<StaticRoute> = self.get(url).await?;
        debug!(count = routes.len(), "listed routing entries");
        Ok(routes)
    }

    /// Create a static route. Returns the stored entry when the router
    /// echoes it back.
    ///
    /// `POST /api/s/{site}/rest/routing/static-route`
    pub async fn create_static_route(
        &self,
        route: &StaticRoute,
    ) -> Result<Option<StaticRoute>, Error> {
        let url = self.site_url("rest/routing/static-route")?;
        let mut created: Vec<StaticRoute> = self.post(url, route).await?;
        debug!(network = %route.network, nexthop = %route.nexthop, "created static route");
        Ok(if created.is_empty() {
            None
        } else {
            Some(created.swap_remove(0))
        })
    }

    /// Delete a routing entry by id.
    ///
    /// `DELETE /api/s/{site}/rest/routing/{id}`
    ///
    /// The router answers `api.err.IdInvalid` for ids it no longer knows;
    /// that comes back as [`Error::InvalidId`].
    pub async fn delete_static_route(&self, id: &str) -> Result<(), Error> {
        let url = self.site_url(&format!("rest/routing/{id}"))?;
        let _: Vec<serde_json::Value> = self.delete(url).await.map_err(|e| match e {
            Error::Api { message } if message.contains("IdInvalid") => Error::InvalidId {
                id: id.to_owned(),
            },
            other => other,
        })?;
        debug!(id, "deleted static route");
        Ok(())
    }
}
