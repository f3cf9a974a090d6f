pub mod logging;
pub mod tunnel;

/// Load `.env` from the working directory if present, so local runs pick up
/// API keys without exporting them
pub fn load_dotenv() {
    dotenv::dotenv().ok();
}

/// Interpret a boolean setting (`1`/`true`, case-insensitive). Unset keeps
/// `default`; any other value is false.
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
