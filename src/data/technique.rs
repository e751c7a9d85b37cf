use std::collections::BTreeMap;

use super::model::Technique;

// ---------------------------------------------------------------------------
// Technique detection
// ---------------------------------------------------------------------------

/// Classify an export from its column names, falling back to raw-text
/// heuristics, and finally to [`Technique::Other`].
///
/// Detection is deterministic and total: the probes run in a fixed
/// order and the first match wins.
pub fn detect_technique(columns: &[String], raw_text: &str) -> Technique {
    if let Some(t) = detect_from_columns(columns) {
        return t;
    }
    detect_from_text(raw_text).unwrap_or(Technique::Other)
}

/// Column-vocabulary pass: exact or near-exact matches against the
/// per-technique column sets the major vendors emit.
fn detect_from_columns(columns: &[String]) -> Option<Technique> {
    let lower: Vec<String> = columns.iter().map(|c| c.to_ascii_lowercase()).collect();
    let has = |probe: &str| lower.iter().any(|c| c.contains(probe));

    // Impedance columns are unambiguous: a frequency axis or complex
    // impedance components.
    if has("freq") || has("re(z)") || has("im(z)") || has("zreal") || has("zimag") || has("zmod") {
        return Some(Technique::Impedance);
    }

    // Battery cycling: capacity columns, or charge/discharge charge
    // counters alongside a cycle index.
    if has("capacity") || has("q charge") || has("q discharge") || has("q-q0") {
        return Some(Technique::Battery);
    }
    if has("cycle") && (has("ewe") || has("ecell")) {
        return Some(Technique::Battery);
    }

    // Tafel / corrosion exports label their current density explicitly.
    if has("log(|i|)") || has("log(i)") || has("icorr") || has("ecorr") {
        return Some(Technique::Tafel);
    }

    // Potential plus current without a time-dominant layout is a sweep.
    let has_potential = has("ewe") || has("vf") || has("potential") || has("voltage");
    let has_current = has("<i>") || has("i/ma") || has("im") || has("current");
    if has_potential && has_current {
        return Some(Technique::CyclicVoltammetry);
    }

    // Current against time at fixed potential.
    if has_current && has("time") {
        return Some(Technique::Chronoamperometry);
    }

    None
}

/// Raw-text pass: vendor technique names that appear in headers.
fn detect_from_text(raw_text: &str) -> Option<Technique> {
    let lower = raw_text.to_ascii_lowercase();
    let has = |probe: &str| lower.contains(probe);

    if has("cyclic voltammetry") || has("cv ") || has("cyclic_voltammetry") {
        return Some(Technique::CyclicVoltammetry);
    }
    if has("impedance") || has("peis") || has("geis") || has("eispot") {
        return Some(Technique::Impedance);
    }
    if has("tafel") || has("corrosion") {
        return Some(Technique::Tafel);
    }
    if has("gcpl") || has("pcga") || has("battery") || has("galvanostatic cycling") {
        return Some(Technique::Battery);
    }
    if has("chronoamperometry") {
        return Some(Technique::Chronoamperometry);
    }
    None
}

// ---------------------------------------------------------------------------
// Unit inference
// ---------------------------------------------------------------------------

/// Derive a physical unit from a column name, where possible.
///
/// Probes in order: a slash suffix (`Ewe/V` → `V`), a parenthesised
/// suffix (`Current (A)` → `A`), then a bare-name lookup for the common
/// electrochemistry quantities.
pub fn unit_for_column(name: &str) -> Option<String> {
    // BioLogic style: "time/s", "Ewe/V", "<I>/mA", "freq/Hz".
    if let Some((_, unit)) = name.rsplit_once('/') {
        let unit = unit.trim();
        if !unit.is_empty() && unit.len() <= 8 && !unit.contains(' ') {
            return Some(unit.to_string());
        }
    }

    // "Current (A)" / "Potential (V)" style.
    if let (Some(open), Some(close)) = (name.rfind('('), name.rfind(')')) {
        if open < close {
            let unit = name[open + 1..close].trim();
            if !unit.is_empty() {
                return Some(unit.to_string());
            }
        }
    }

    // Bare names, as Gamry column headers use.
    let lower = name.trim().to_ascii_lowercase();
    let unit = match lower.as_str() {
        "t" | "time" => "s",
        "vf" | "vm" | "v" | "e" | "potential" | "voltage" => "V",
        "im" | "i" | "current" => "A",
        "freq" | "frequency" => "Hz",
        "zreal" | "zimag" | "zmod" | "z" | "impedance" => "Ohm",
        "zphz" | "phase" => "deg",
        "capacity" => "mA·h",
        "temp" | "temperature" => "°C",
        _ => return None,
    };
    Some(unit.to_string())
}

/// Build the unit map for a set of columns, keeping only the columns a
/// unit could be derived for.
pub fn units_for_columns(columns: &[String]) -> BTreeMap<String, String> {
    columns
        .iter()
        .filter_map(|c| unit_for_column(c).map(|u| (c.clone(), u)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impedance_wins_over_sweep_columns() {
        let cols: Vec<String> = ["freq/Hz", "Re(Z)/Ohm", "-Im(Z)/Ohm", "Ewe/V", "I/mA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(detect_technique(&cols, ""), Technique::Impedance);
    }

    #[test]
    fn potential_and_current_classify_as_cv() {
        let cols: Vec<String> = ["Ewe/V", "<I>/mA", "time/s"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(detect_technique(&cols, ""), Technique::CyclicVoltammetry);
    }

    #[test]
    fn text_fallback_and_other_sentinel() {
        let none: Vec<String> = vec!["a".into(), "b".into()];
        assert_eq!(
            detect_technique(&none, "Technique : Tafel analysis"),
            Technique::Tafel
        );
        assert_eq!(detect_technique(&none, "nothing known"), Technique::Other);
    }

    #[test]
    fn unit_inference_probes_in_order() {
        assert_eq!(unit_for_column("Ewe/V").as_deref(), Some("V"));
        assert_eq!(unit_for_column("freq/Hz").as_deref(), Some("Hz"));
        assert_eq!(unit_for_column("Current (A)").as_deref(), Some("A"));
        assert_eq!(unit_for_column("Vf").as_deref(), Some("V"));
        assert_eq!(unit_for_column("sample"), None);
    }
}
