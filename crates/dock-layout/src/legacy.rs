//! Factory ids of retired station variants.
//!
//! Older files name a few stations through a "secure" variant. The variants
//! no longer exist, so their ids are redirected to the plain station ids.
//! Everything about the aliasing lives in this module.

/// Stations that once had a secure variant.
const LEGACY_STATIONS: [&str; 4] = ["flap dock", "screen dock", "split dock", "stack dock"];

/// `(legacy prefix, replacement prefix)`; the remainder must be a legacy station.
const ALIASES: [(&str, &str); 2] = [("secure ", ""), ("delegate_secure ", "delegate_")];

/// The id to retry with when `id` is not registered, if any.
pub fn legacy_alias(id: &str) -> Option<String> {
    ALIASES.iter().find_map(|(prefix, replacement)| {
        let station = id.strip_prefix(prefix)?;
        LEGACY_STATIONS
            .contains(&station)
            .then(|| format!("{}{}", replacement, station))
    })
}
