mod proxy;

pub use proxy::{INDEX_BODY, index_response, proxy};
