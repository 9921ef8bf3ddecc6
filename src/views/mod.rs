pub mod cluster;
pub mod cube;

pub use cluster::{ClusterOptions, ClusterParams, ClusterView, ParamChange};
pub use cube::CubeView;

/// The views the host shell can mount, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[default]
    Cube,
    Cluster,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Cube, Route::Cluster];

    pub fn label(self) -> &'static str {
        match self {
            Route::Cube => "Hover cube",
            Route::Cluster => "Clipped spheres",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
