use crate::dispatcher::FilterChain;
use crate::error::Result;
use crate::exchange::{Request, Response};
use crate::registry::FilterEnvironment;

pub trait Filter: Send + Sync {
    fn init(&self, _env: &FilterEnvironment) -> Result<()> {
        Ok(())
    }

    fn do_filter(&self, request: &Request, response: &Response, chain: FilterChain<'_>)
        -> Result<()>;

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}
