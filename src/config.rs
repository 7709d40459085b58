/// Settings for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace every parsed package is tagged with.
    pub namespace: String,
    /// Nested user function calls allowed before evaluation is aborted.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: "main".to_string(),
            max_call_depth: 200,
        }
    }
}
