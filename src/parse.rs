//! Set-notation parsing for `log-session`.
//!
//! Accepted forms, comma-separated:
//!
//! - `8`            one set of 8 reps, bodyweight, default rest
//! - `8@2.5`        added weight in kg (`+` and `kg` optional: `8@+2.5kg`)
//! - `8@0/120`      rest before the set in seconds (`s` suffix optional)
//! - `8/120`        reps and rest, bodyweight
//! - `4x5`          compact block: 4 sets of 5 reps; may carry a weight
//!                  and rest suffix: `4x5 +2.5kg / 240s`
//!
//! The default rest of 180 s matches the reference rest interval.

use crate::error::{BarplanError, Result};

/// One parsed set: (reps, added weight kg, rest seconds)
pub type ParsedSet = (u32, f64, u32);

const DEFAULT_REST_S: u32 = 180;

/// Parse a full `--sets` argument into individual sets
pub fn parse_sets(input: &str) -> Result<Vec<ParsedSet>> {
    let mut sets = Vec::new();
    for raw in input.split(',') {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }
        if let Some(block) = parse_compact_block(entry)? {
            sets.extend(block);
        } else {
            sets.push(parse_single_set(entry)?);
        }
    }
    if sets.is_empty() {
        return Err(BarplanError::InvalidInput(
            "no sets given; expected e.g. \"8@0/180,6@0\" or \"4x5 / 240s\"".to_string(),
        ));
    }
    Ok(sets)
}

/// `SETSxREPS [+Wkg] [/ Rs]` → repeated identical sets, or None when the
/// entry is not in block form
fn parse_compact_block(entry: &str) -> Result<Option<Vec<ParsedSet>>> {
    let lower = entry.to_lowercase();
    let Some(x_pos) = lower.find('x') else {
        return Ok(None);
    };

    let (count_part, rest_part) = lower.split_at(x_pos);
    let count: u32 = match count_part.trim().parse() {
        Ok(n) => n,
        Err(_) => return Ok(None),
    };

    let mut remainder = rest_part[1..].trim().to_string();
    let mut weight = 0.0;
    let mut rest = DEFAULT_REST_S;

    if let Some(slash) = remainder.find('/') {
        let rest_str = remainder[slash + 1..].trim().trim_end_matches('s').trim();
        rest = rest_str.parse().map_err(|_| {
            BarplanError::InvalidInput(format!("bad rest in set block: {entry:?}"))
        })?;
        remainder = remainder[..slash].trim().to_string();
    }

    if let Some(plus) = remainder.find('+') {
        let weight_str = remainder[plus + 1..].trim().trim_end_matches("kg").trim();
        weight = weight_str.parse().map_err(|_| {
            BarplanError::InvalidInput(format!("bad weight in set block: {entry:?}"))
        })?;
        remainder = remainder[..plus].trim().to_string();
    }

    let reps: u32 = remainder.trim().parse().map_err(|_| {
        BarplanError::InvalidInput(format!("bad reps in set block: {entry:?}"))
    })?;

    if count == 0 || count > 50 {
        return Err(BarplanError::InvalidInput(format!(
            "set count out of range in {entry:?}"
        )));
    }

    Ok(Some(vec![(reps, weight, rest); count as usize]))
}

/// `reps[@weight][/rest]`
fn parse_single_set(entry: &str) -> Result<ParsedSet> {
    let mut reps_part = entry;
    let mut weight = 0.0;
    let mut rest = DEFAULT_REST_S;

    if let Some(slash) = reps_part.find('/') {
        let rest_str = reps_part[slash + 1..].trim().trim_end_matches('s').trim();
        rest = rest_str
            .parse()
            .map_err(|_| BarplanError::InvalidInput(format!("bad rest in set: {entry:?}")))?;
        reps_part = reps_part[..slash].trim();
    }

    if let Some(at) = reps_part.find('@') {
        let weight_str = reps_part[at + 1..]
            .trim()
            .trim_start_matches('+')
            .trim_end_matches("kg")
            .trim();
        weight = weight_str
            .parse()
            .map_err(|_| BarplanError::InvalidInput(format!("bad weight in set: {entry:?}")))?;
        reps_part = reps_part[..at].trim();
    }

    let reps: u32 = reps_part
        .trim()
        .parse()
        .map_err(|_| BarplanError::InvalidInput(format!("bad reps in set: {entry:?}")))?;

    if reps > 200 {
        return Err(BarplanError::InvalidInput(format!(
            "reps out of range: {reps}"
        )));
    }
    if weight < 0.0 || weight > 200.0 {
        return Err(BarplanError::InvalidInput(format!(
            "weight out of range: {weight}"
        )));
    }

    Ok((reps, weight, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_reps() {
        assert_eq!(parse_sets("8").unwrap(), vec![(8, 0.0, 180)]);
    }

    #[test]
    fn test_full_notation() {
        assert_eq!(
            parse_sets("8@0/180,6@2.5/120,5@+2.5kg").unwrap(),
            vec![(8, 0.0, 180), (6, 2.5, 120), (5, 2.5, 180)]
        );
    }

    #[test]
    fn test_reps_with_rest_only() {
        assert_eq!(parse_sets("8/90s").unwrap(), vec![(8, 0.0, 90)]);
    }

    #[test]
    fn test_compact_block() {
        assert_eq!(
            parse_sets("4x5 +0.5kg / 240s").unwrap(),
            vec![(5, 0.5, 240); 4]
        );
    }

    #[test]
    fn test_compact_block_mixed_with_singles() {
        assert_eq!(
            parse_sets("4, 3x8 / 60s").unwrap(),
            vec![(4, 0.0, 180), (8, 0.0, 60), (8, 0.0, 60), (8, 0.0, 60)]
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_sets("abc").is_err());
        assert!(parse_sets("").is_err());
        assert!(parse_sets("8@weight").is_err());
        assert!(parse_sets("999").is_err());
    }
}
