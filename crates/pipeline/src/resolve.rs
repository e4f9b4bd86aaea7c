//! Link resolution seam.

use mediarelay_resolver::{Client, Error as ResolveError, ResolvedLink};
use mediarelay_transfer::BoxFuture;

/// Resolves share links and fetches their thumbnails.
pub trait LinkResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        source_url: &'a str,
    ) -> BoxFuture<'a, Result<ResolvedLink, ResolveError>>;

    fn fetch_thumbnail<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ResolveError>>;
}

impl LinkResolver for Client {
    fn resolve<'a>(
        &'a self,
        source_url: &'a str,
    ) -> BoxFuture<'a, Result<ResolvedLink, ResolveError>> {
        Box::pin(Client::resolve(self, source_url))
    }

    fn fetch_thumbnail<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ResolveError>> {
        Box::pin(self.download_thumbnail(url))
    }
}
