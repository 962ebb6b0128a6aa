//! Tracked fit quantities.

use serde::{Deserialize, Serialize};

use crate::domain::GaussianFit;

/// One of the eight scalars mapped per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Constant,
    ConstantErr,
    Mean,
    MeanErr,
    Sigma,
    SigmaErr,
    Chi2,
    Ndf,
}

/// Static description of a quantity: artifact name, plot label and the
/// optional colour-scale range used when rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityDescriptor {
    pub quantity: Quantity,
    pub name: &'static str,
    pub label: &'static str,
    pub display_range: Option<(f64, f64)>,
}

/// Descriptors in persistence order.
pub const QUANTITIES: [QuantityDescriptor; 8] = [
    QuantityDescriptor {
        quantity: Quantity::Constant,
        name: "c",
        label: "Constant",
        display_range: None,
    },
    QuantityDescriptor {
        quantity: Quantity::ConstantErr,
        name: "c_err",
        label: "Constant error",
        display_range: None,
    },
    QuantityDescriptor {
        quantity: Quantity::Mean,
        name: "mu",
        label: "Mean threshold",
        display_range: Some((0.0, 250.0)),
    },
    QuantityDescriptor {
        quantity: Quantity::MeanErr,
        name: "mu_err",
        label: "Mean threshold error",
        display_range: Some((0.0, 5.0)),
    },
    QuantityDescriptor {
        quantity: Quantity::Sigma,
        name: "sigma",
        label: "Sigma",
        display_range: Some((0.0, 20.0)),
    },
    QuantityDescriptor {
        quantity: Quantity::SigmaErr,
        name: "sigma_err",
        label: "Sigma error",
        display_range: Some((0.0, 2.0)),
    },
    QuantityDescriptor {
        quantity: Quantity::Chi2,
        name: "chi2",
        label: "Chi-square",
        display_range: Some((0.0, 500.0)),
    },
    QuantityDescriptor {
        quantity: Quantity::Ndf,
        name: "ndf",
        label: "Degrees of freedom",
        display_range: None,
    },
];

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::Constant,
        Quantity::ConstantErr,
        Quantity::Mean,
        Quantity::MeanErr,
        Quantity::Sigma,
        Quantity::SigmaErr,
        Quantity::Chi2,
        Quantity::Ndf,
    ];

    pub fn descriptor(self) -> &'static QuantityDescriptor {
        &QUANTITIES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    pub fn display_range(self) -> Option<(f64, f64)> {
        self.descriptor().display_range
    }

    /// Extract this quantity from a fit.
    pub fn value(self, fit: &GaussianFit) -> f64 {
        match self {
            Quantity::Constant => fit.constant,
            Quantity::ConstantErr => fit.constant_err,
            Quantity::Mean => fit.mean,
            Quantity::MeanErr => fit.mean_err,
            Quantity::Sigma => fit.sigma,
            Quantity::SigmaErr => fit.sigma_err,
            Quantity::Chi2 => fit.chi2,
            Quantity::Ndf => f64::from(fit.ndf),
        }
    }
}
