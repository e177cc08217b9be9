//! HTTP transport used by the fetch workers.

use super::error::FetchError;

/// Blocking "GET the whole body" transport shared by all workers.
pub trait Fetch: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// libcurl easy-handle transport. One handle per request, redirects followed,
/// no timeouts on the read.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlFetcher;

impl Fetch for CurlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Http { status });
        }
        Ok(body)
    }
}
