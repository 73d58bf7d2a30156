//! Name/value front end for [`SolveOptions`].
//!
//! Options can be given as `(name, value)` pairs or as one flat list
//! alternating names and values. Names are matched case-insensitively:
//!
//! | Name          | Value                                   |
//! |---------------|-----------------------------------------|
//! | `TOL`         | positive scalar                         |
//! | `MAXITER`     | positive integer                        |
//! | `VERBOSE`     | bool, `"yes"`/`"no"` or a number        |
//! | `PARALLEL`    | bool, `"yes"`/`"no"` or a number        |
//! | `LAMBDA_A`    | scalar or vector (N)                    |
//! | `RHO`         | scalar or vector (Ny)                   |
//! | `RHOV`        | scalar or vector (N+2L)                 |
//! | `CONCAVEBASE` | matrix (L×L)                            |
//! | `X0`, `Z0`, `B0`, `R0`, `D0` | matrix, or a vector used as one column |
//!
//! A name given twice keeps the last value.

use ndarray::{Array1, Array2, Axis};

use crate::error::{HuwacbError, Result};

use super::config::{Penalty, SolveOptions, WarmStart};

/// A loosely typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Bool(bool),
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            OptionValue::Text(_) => "text",
            OptionValue::Bool(_) => "bool",
            OptionValue::Scalar(_) => "scalar",
            OptionValue::Vector(_) => "vector",
            OptionValue::Matrix(_) => "matrix",
        }
    }

    fn as_scalar(&self, name: &str) -> Result<f64> {
        match self {
            OptionValue::Scalar(v) => Ok(*v),
            OptionValue::Vector(v) if v.len() == 1 => Ok(v[0]),
            OptionValue::Matrix(m) if m.len() == 1 => Ok(m[[0, 0]]),
            other => Err(wrong_kind(name, "a scalar", other)),
        }
    }

    fn as_flag(&self, name: &str) -> Result<bool> {
        match self {
            OptionValue::Bool(b) => Ok(*b),
            OptionValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "yes" | "true" | "on" => Ok(true),
                "no" | "false" | "off" => Ok(false),
                _ => Err(HuwacbError::InvalidParameter(format!(
                    "{} must be yes or no, got '{}'",
                    name, s
                ))),
            },
            other => Ok(other.as_scalar(name)? != 0.0),
        }
    }

    fn as_penalty(&self, name: &str) -> Result<Penalty> {
        match self {
            OptionValue::Scalar(v) => Ok(Penalty::Scalar(*v)),
            OptionValue::Vector(v) => Ok(Penalty::Vector(v.clone())),
            OptionValue::Matrix(m) if m.ncols() == 1 => Ok(Penalty::Vector(m.column(0).to_owned())),
            OptionValue::Matrix(m) if m.nrows() == 1 => Ok(Penalty::Vector(m.row(0).to_owned())),
            other => Err(wrong_kind(name, "a scalar or vector", other)),
        }
    }

    fn into_matrix(self, name: &str) -> Result<Array2<f64>> {
        match self {
            OptionValue::Matrix(m) => Ok(m),
            OptionValue::Vector(v) => Ok(v.insert_axis(Axis(1))),
            other => Err(wrong_kind(name, "a matrix or vector", &other)),
        }
    }
}

fn wrong_kind(name: &str, expected: &str, got: &OptionValue) -> HuwacbError {
    HuwacbError::InvalidParameter(format!("{} must be {}, got {}", name, expected, got.kind()))
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Scalar(v)
    }
}

impl From<usize> for OptionValue {
    fn from(v: usize) -> Self {
        OptionValue::Scalar(v as f64)
    }
}

impl From<Array1<f64>> for OptionValue {
    fn from(v: Array1<f64>) -> Self {
        OptionValue::Vector(v)
    }
}

impl From<Array2<f64>> for OptionValue {
    fn from(m: Array2<f64>) -> Self {
        OptionValue::Matrix(m)
    }
}

impl SolveOptions {
    /// Build options from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// * `HuwacbError::UnknownOption` for an unrecognized name
    /// * `HuwacbError::InvalidParameter` for a value of the wrong kind or range
    /// * `HuwacbError::ConflictingWarmStart` if both `Z0` and `B0` are given
    /// * `HuwacbError::IncompleteWarmStart` if only part of the warm start is given
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        let mut options = SolveOptions::default();
        let (mut x0, mut z0, mut b0, mut r0, mut d0) = (None, None, None, None, None);

        for (name, value) in pairs {
            let key = name.to_ascii_uppercase();
            match key.as_str() {
                "TOL" => options.config.tol = value.as_scalar(&key)?,
                "MAXITER" => options.config.max_iterations = parse_count(&key, value.as_scalar(&key)?)?,
                "VERBOSE" => options.config.verbose = value.as_flag(&key)?,
                "PARALLEL" => options.config.parallel = value.as_flag(&key)?,
                "LAMBDA_A" => options.lambda_a = value.as_penalty(&key)?,
                "RHO" => options.rho = value.as_penalty(&key)?,
                "RHOV" => options.rhov = value.as_penalty(&key)?,
                "CONCAVEBASE" => options.concave_base = Some(value.into_matrix(&key)?),
                "X0" => x0 = Some(value.into_matrix(&key)?),
                "Z0" => z0 = Some(value.into_matrix(&key)?),
                "B0" => b0 = Some(value.into_matrix(&key)?),
                "R0" => r0 = Some(value.into_matrix(&key)?),
                "D0" => d0 = Some(value.into_matrix(&key)?),
                _ => return Err(HuwacbError::UnknownOption(name.to_string())),
            }
        }

        options.warm_start = WarmStart::from_blocks(x0, z0, b0, r0, d0)?;
        options.validate()?;
        Ok(options)
    }

    /// Build options from a flat list alternating names and values.
    ///
    /// # Errors
    ///
    /// * `HuwacbError::InvalidInput` if the list has odd length or a name is not text
    /// * Everything [`SolveOptions::from_pairs`] reports
    pub fn from_args(args: Vec<OptionValue>) -> Result<Self> {
        if args.len() % 2 != 0 {
            return Err(HuwacbError::InvalidInput(format!(
                "options must come in name/value pairs, got {} entries",
                args.len()
            )));
        }

        let mut names = Vec::with_capacity(args.len() / 2);
        let mut values = Vec::with_capacity(args.len() / 2);
        let mut iter = args.into_iter();
        while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
            match name {
                OptionValue::Text(name) => names.push(name),
                other => {
                    return Err(HuwacbError::InvalidInput(format!(
                        "option name must be text, got {}",
                        other.kind()
                    )))
                }
            }
            values.push(value);
        }

        Self::from_pairs(names.iter().map(String::as_str).zip(values))
    }
}

fn parse_count(name: &str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
        return Err(HuwacbError::InvalidParameter(format!(
            "{} must be a positive integer, got {}",
            name, value
        )));
    }
    Ok(value as usize)
}
