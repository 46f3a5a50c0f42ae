/// Read an on/off switch from an environment value.
///
/// Case and surrounding whitespace are ignored. The error names the variable
/// so a bad deployment value is reported as-is at startup.
pub fn parse_flag(name: &str, raw: &str) -> Result<bool, String> {
    const ON: [&str; 4] = ["true", "1", "yes", "on"];
    const OFF: [&str; 4] = ["false", "0", "no", "off"];

    let value = raw.trim();
    if ON.iter().any(|v| value.eq_ignore_ascii_case(v)) {
        Ok(true)
    } else if OFF.iter().any(|v| value.eq_ignore_ascii_case(v)) {
        Ok(false)
    } else {
        Err(format!(
            "Invalid {name} environment variable '{raw}': expected one of {}",
            ON.iter().chain(OFF.iter()).copied().collect::<Vec<_>>().join(", ")
        ))
    }
}
