use regex::Regex;

/// The contents of an Atomic Charge File (ACF.dat) as written by the
/// Henkelman group's bader executable.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicChargeFile {
    pub charge: Vec<f64>,
    pub min_dist: Vec<f64>,
    pub atomic_volume: Vec<f64>,
    pub vacuum_charge: f64,
    pub vacuum_volume: f64,
}

fn number(token: &str, what: &str, line: usize) -> Result<f64, String> {
    token.parse::<f64>()
         .ok()
         .filter(|v| v.is_finite())
         .ok_or_else(|| format!("{} \"{}\" on line {} is not a number", what, token, line + 1))
}

/// Parses the ACF.dat table: a header, a dashed rule, one row per atom
/// (#, X, Y, Z, CHARGE, MIN DIST, ATOMIC VOL), a second rule and a footer
/// with the vacuum charge and volume.
pub fn parse(text: &str) -> Result<AtomicChargeFile, String> {
    let mut rules = text.lines()
                        .enumerate()
                        .filter(|(_, l)| l.trim_start().starts_with("---"))
                        .map(|(i, _)| i);
    let (start, stop) = match (rules.next(), rules.next()) {
        (Some(start), Some(stop)) => (start, stop),
        _ => return Err(String::from("missing table rules")),
    };
    let mut charge = Vec::with_capacity(stop - start);
    let mut min_dist = Vec::with_capacity(stop - start);
    let mut atomic_volume = Vec::with_capacity(stop - start);
    for (i, line) in text.lines().enumerate().take(stop).skip(start + 1) {
        let tokens = line.split_whitespace().collect::<Vec<&str>>();
        if tokens.len() < 7 {
            return Err(format!("line {} has {} columns, expected 7", i + 1, tokens.len()));
        }
        charge.push(number(tokens[4], "charge", i)?);
        min_dist.push(number(tokens[5], "minimum distance", i)?);
        atomic_volume.push(number(tokens[6], "atomic volume", i)?);
    }
    if charge.is_empty() {
        return Err(String::from("no atoms in table"));
    }
    let footer = |label: &str| -> Result<f64, String> {
        let re = Regex::new(&format!(r"(?m)^\s*{}:\s*(\S+)", label))
            .map_err(|e| e.to_string())?;
        let value = re.captures(text)
                      .and_then(|c| c.get(1))
                      .ok_or_else(|| format!("missing {}", label))?;
        value.as_str()
             .parse::<f64>()
             .ok()
             .filter(|v| v.is_finite())
             .ok_or_else(|| format!("{} \"{}\" is not a number", label, value.as_str()))
    };
    Ok(AtomicChargeFile { charge,
                          min_dist,
                          atomic_volume,
                          vacuum_charge: footer("VACUUM CHARGE")?,
                          vacuum_volume: footer("VACUUM VOLUME")? })
}

/// Finds the program version in the banner the executable prints.
pub fn version(stdout: &str) -> Option<f64> {
    let re = Regex::new(r"Version\s+(\d+(?:\.\d+)?)").ok()?;
    re.captures(stdout)?.get(1)?.as_str().parse::<f64>().ok()
}
