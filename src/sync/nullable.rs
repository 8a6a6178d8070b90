use serde::Deserialize;

/// Reads an empty cell or `\N` as `None`, anything else through `FromStr`.
pub fn nullable<'de, D, T, E>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr<Err = E>,
    E: std::fmt::Display,
{
    use serde::de::Error;

    let val = String::deserialize(de)?;
    let val = val.trim();
    if val.is_empty() || val == "\\N" {
        Ok(None)
    } else {
        val.parse()
            .map(Some)
            .map_err(|e: E| D::Error::custom(format!("{val:?}: {e}")))
    }
}
