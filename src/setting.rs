//! Common toggle surface for app and driver settings

pub trait VRSetting {
    /// Stable identifier (app key or driver name)
    fn identifier(&self) -> &str;
    fn readable_name(&self) -> &str;
    fn enabled(&self) -> bool;
    /// Change the flag and mark the setting dirty
    fn set_enabled(&mut self, enabled: bool);
    fn is_dirty(&self) -> bool;

    /// Case-insensitive match on identifier or readable name
    fn matches(&self, query: &str) -> bool {
        self.identifier().eq_ignore_ascii_case(query) || self.readable_name().eq_ignore_ascii_case(query)
    }
}
