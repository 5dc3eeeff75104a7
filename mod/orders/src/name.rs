use chrono::{DateTime, Datelike, Timelike, Utc};

/// Material mnemonics keyed by item-index prefix. First match wins, so the
/// order here is significant.
pub const MATERIAL_PREFIXES: &[(&str, &str)] = &[
    ("721C0004", "Skl4"),
    ("721C0006", "Skl6"),
    ("721C0012", "Skl12"),
    ("721C0015", "Skl15"),
    ("721C0018", "Skl18"),
    ("711C0015", "W15"),
    ("711C0018", "W18"),
    ("711C0025", "W25"),
    ("714C0016", "WW16"),
    ("716C0016", "WB16"),
    ("713C0018", "WB18"),
    ("715C0016", "WA16"),
    ("771C0012", "OSB"),
    ("781C0015", "VSkl15"),
];

/// Production location codes accepted on cutting cards.
pub const LOCATIONS: &[&str] = &["B", "W", "P", "S", "A", "D", "ST"];

/// Resolve a material mnemonic from an item index by prefix match.
pub fn material_for_index(index: &str) -> Option<&'static str> {
    let index = index.trim();
    if index.is_empty() {
        return None;
    }
    MATERIAL_PREFIXES
        .iter()
        .find(|(prefix, _)| index.starts_with(prefix))
        .map(|(_, name)| *name)
}

/// Build the deterministic card name:
///
/// ```text
/// P{program:02}_{material}_{plates}Pl_{loc}_{week:02}{weekday}_{hour}.{minute:02}
/// ```
///
/// Week and weekday are ISO (Monday = 1). `plates` is rendered literally,
/// even when below the computational floor of 1. An unresolvable material
/// renders as `??`.
pub fn card_name(
    program: i64,
    material: Option<&str>,
    plates: i64,
    loc: &str,
    at: DateTime<Utc>,
) -> String {
    let week = at.iso_week().week();
    let weekday = at.weekday().number_from_monday();
    format!(
        "P{:02}_{}_{}Pl_{}_{:02}{}_{}.{:02}",
        program,
        material.unwrap_or("??"),
        plates,
        loc,
        week,
        weekday,
        at.hour(),
        at.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn material_prefix_lookup() {
        assert_eq!(material_for_index("721C0015-03"), Some("Skl15"));
        assert_eq!(material_for_index("711C0018"), Some("W18"));
        assert_eq!(material_for_index("781C0015-XX"), Some("VSkl15"));
        assert_eq!(material_for_index("  721C0004  "), Some("Skl4"));
        assert_eq!(material_for_index("999X0000"), None);
        assert_eq!(material_for_index(""), None);
    }

    #[test]
    fn name_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 9, 5, 0).unwrap();
        let a = card_name(1, Some("Skl15"), 3, "W", at);
        let b = card_name(1, Some("Skl15"), 3, "W", at);
        assert_eq!(a, b);
        // 2026-08-25 is a Tuesday in ISO week 35.
        assert_eq!(a, "P01_Skl15_3Pl_W_352_9.05");
    }

    #[test]
    fn name_pads_program_and_minute_but_not_hour() {
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 14, 7, 0).unwrap();
        assert_eq!(card_name(7, Some("W18"), 1, "B", at), "P07_W18_1Pl_B_352_14.07");
    }

    #[test]
    fn name_falls_back_to_unknown_material() {
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 9, 5, 0).unwrap();
        assert_eq!(card_name(2, None, 5, "ST", at), "P02_??_5Pl_ST_352_9.05");
    }

    #[test]
    fn iso_week_crosses_year_boundaries() {
        // Friday 2027-01-01 belongs to ISO week 53 of 2026.
        let at = Utc.with_ymd_and_hms(2027, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(card_name(1, Some("Skl4"), 1, "W", at), "P01_Skl4_1Pl_W_535_8.00");

        // Monday 2024-12-30 belongs to ISO week 1 of 2025.
        let at = Utc.with_ymd_and_hms(2024, 12, 30, 23, 59, 0).unwrap();
        assert_eq!(card_name(1, Some("Skl4"), 1, "W", at), "P01_Skl4_1Pl_W_011_23.59");
    }

    #[test]
    fn plates_render_literally() {
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 9, 5, 0).unwrap();
        assert_eq!(card_name(1, Some("OSB"), 0, "W", at), "P01_OSB_0Pl_W_352_9.05");
    }
}
