//! Kernel table: maps operation names to weight matrices or pointwise
//! transforms.
//!
//! Matrices are indexed `[i][j]` where `i` walks the x axis and `j` the y
//! axis of the neighborhood, matching [`crate::pipeline::convolve::apply`].

use crate::error::KernelError;

/// Grayscale channel weights for R, G and B.
///
/// This is a channel mix, not a luminance formula. The weights sum to 2.8,
/// so the averaged result is always darker than the brightest input.
pub const GRAY_WEIGHTS: [f64; 3] = [0.92126, 0.97152, 0.90722];

/// An immutable square matrix of convolution weights with odd side length.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    side: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a kernel from its rows.
    ///
    /// Fails unless the matrix is square with an odd side.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, KernelError> {
        let side = rows.len();
        if side % 2 == 0 {
            return Err(KernelError::EvenSide(side));
        }
        let mut weights = Vec::with_capacity(side * side);
        for row in rows {
            let row = row.as_ref();
            if row.len() != side {
                return Err(KernelError::NotSquare {
                    rows: side,
                    cols: row.len(),
                });
            }
            weights.extend_from_slice(row);
        }
        Ok(Self { side, weights })
    }

    /// Side length of the matrix.
    pub fn side(&self) -> usize {
        self.side
    }

    /// How far the neighborhood extends from the center pixel.
    pub fn offset(&self) -> usize {
        self.side / 2
    }

    /// Weight at `[i][j]`.
    #[inline]
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.side + j]
    }

    /// Iterate over the matrix rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.weights.chunks(self.side)
    }

    /// Sum of all weights (1.0 for normalized blur kernels).
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// What to do to every image in the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Neighborhood convolution with the given kernel
    Convolve(Kernel),
    /// Pointwise channel-mix grayscale
    Grayscale,
}

impl Operation {
    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Convolve(k) => format!("convolve {}x{}", k.side(), k.side()),
            Self::Grayscale => "grayscale".to_string(),
        }
    }

    /// Every named operation with a one-line description, in display order.
    pub fn catalog() -> &'static [(&'static str, &'static str)] {
        CATALOG
    }
}

const CATALOG: &[(&str, &str)] = &[
    ("Identity", "3x3 identity, copies interior pixels"),
    ("LSobel", "3x3 Sobel edge detector, left"),
    ("RSobel", "3x3 Sobel edge detector, right"),
    ("TSobel", "3x3 Sobel edge detector, top"),
    ("BSobel", "3x3 Sobel edge detector, bottom"),
    ("Emboss", "3x3 emboss"),
    ("Outline", "3x3 outline"),
    ("Sharp", "3x3 sharpen"),
    ("Blur", "3x3 box-weighted blur"),
    ("Gaussian", "5x5 binomial Gaussian blur"),
    ("GrayScale", "pointwise channel-mix grayscale"),
];

/// Resolve the run's operation.
///
/// A custom spec wins over the name. Both are validated here, before the
/// pipeline touches the filesystem.
pub fn resolve(name: Option<&str>, custom: Option<&str>) -> Result<Operation, KernelError> {
    if let Some(spec) = custom {
        return parse_custom(spec).map(Operation::Convolve);
    }
    let name = name.ok_or(KernelError::MissingOperation)?;
    lookup(name)
}

/// Look up a named operation (case-insensitive).
pub fn lookup(name: &str) -> Result<Operation, KernelError> {
    let rows: &[[f64; 3]] = match name.to_ascii_lowercase().as_str() {
        "grayscale" => return Ok(Operation::Grayscale),
        "gaussian" => return Ok(Operation::Convolve(gaussian_5x5())),
        "identity" => &[[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
        "bsobel" => &[[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]],
        "lsobel" => &[[1.0, 0.0, -1.0], [2.0, 0.0, -2.0], [1.0, 0.0, -1.0]],
        "rsobel" => &[[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]],
        "tsobel" => &[[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]],
        "emboss" => &[[-2.0, -1.0, 0.0], [-1.0, 1.0, 1.0], [0.0, 1.0, 2.0]],
        "outline" => &[[-1.0, -1.0, -1.0], [-1.0, 8.0, -1.0], [-1.0, -1.0, -1.0]],
        "sharp" => &[[0.0, -0.6, 0.0], [-0.6, 3.0, -0.6], [0.0, -0.6, 0.0]],
        "blur" => &[
            [0.0625, 0.125, 0.0625],
            [0.125, 0.25, 0.125],
            [0.0625, 0.125, 0.0625],
        ],
        _ => return Err(KernelError::UnknownOperation(name.to_string())),
    };
    Kernel::from_rows(rows).map(Operation::Convolve)
}

/// Parse a custom 3x3 kernel from nine whitespace-separated real numbers.
///
/// Tokens fill the matrix row by row.
pub fn parse_custom(spec: &str) -> Result<Kernel, KernelError> {
    let invalid = |reason: String| KernelError::InvalidKernelSpec {
        spec: spec.to_string(),
        reason,
    };

    let tokens: Vec<&str> = spec.split_whitespace().collect();
    if tokens.len() != 9 {
        return Err(invalid(format!("expected 9 numbers, got {}", tokens.len())));
    }

    let mut values = [0.0f64; 9];
    for (slot, token) in values.iter_mut().zip(&tokens) {
        let value: f64 = token
            .parse()
            .map_err(|_| invalid(format!("{token:?} is not a number")))?;
        if !value.is_finite() {
            return Err(invalid(format!("{token:?} is not finite")));
        }
        *slot = value;
    }

    Kernel::from_rows(&[
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
        [values[6], values[7], values[8]],
    ])
}

/// 5x5 binomial kernel, the outer product of `[1, 4, 6, 4, 1] / 16`.
fn gaussian_5x5() -> Kernel {
    const TAPS: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
    let rows: Vec<Vec<f64>> = TAPS
        .iter()
        .map(|a| TAPS.iter().map(|b| a * b / 256.0).collect())
        .collect();
    Kernel {
        side: 5,
        weights: rows.concat(),
    }
}
