//! Configuration access port.
//!
//! Typed lookup by INI section and key; numeric getters fall back to the
//! supplied default when the key is absent or does not parse.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    /// Every `(section, key)` pair present in the source, sorted.
    fn entries(&self) -> Vec<(String, String)>;
}
