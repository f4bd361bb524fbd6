mod labels;
pub use labels::Labels;

mod keys;
pub use keys::{ServiceLabel, SwarmLabel};

mod constants;
pub use constants::{
    DEFAULT_NETWORK, INGRESS_NETWORK, LABEL_PREFIX, LEGACY_CONTROL_NETWORK,
    LEGACY_CONTROL_SERVICE,
};
