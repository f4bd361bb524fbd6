mod update;
pub use update::UpdateOrder;

mod proxy;
pub use proxy::ProxyConvention;
