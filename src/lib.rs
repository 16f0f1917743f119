pub mod config;
pub mod constants;
pub mod error;
pub mod solar;
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod file_utils;
    pub mod model_logger;
    pub mod model_utils;
    pub mod plotting;
    pub mod pre_processor;
    pub mod synthetic_data;
    #[cfg(test)]
    pub mod test_utils;
}

/// Package and toolchain details captured at build time
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
