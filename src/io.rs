use std::fmt;

pub mod acf;
pub mod vasp;

/// Formats a float in the Fortran `0.dddE+xx` style read by the external
/// tools. The precision sets the number of significant digits; the default
/// of 17 is enough for any f64 to be read back unchanged.
pub struct FortranFormat {
    pub float: f64,
}

impl fmt::Display for FortranFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(17).max(1);
        if !self.float.is_finite() {
            return write!(f, "{}", self.float);
        }
        let sign = if self.float.is_sign_negative() { "-" } else { "" };
        if self.float == 0.0 {
            return write!(f, "{}0.{:0<width$}E+00", sign, "", width = digits);
        }
        let scientific = format!("{:.*e}", digits - 1, self.float.abs());
        let (mantissa, exponent) = scientific.split_once('e').ok_or(fmt::Error)?;
        // 1.234e2 is 0.1234E+03
        let exponent = exponent.parse::<i32>().map_err(|_| fmt::Error)? + 1;
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        write!(f,
               "{}0.{}E{}{:02}",
               sign,
               mantissa.replace('.', ""),
               exponent_sign,
               exponent.abs())
    }
}

/// Shortest representation of a float that reads back to the same value.
pub struct Exact(pub f64);

impl fmt::Display for Exact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = format!("{:?}", self.0);
        f.pad(&text)
    }
}
