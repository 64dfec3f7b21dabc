//! # Radiative property surrogate
//!
//! A dense feed-forward regression network trained on RADCAL data maps
//! `(T_w, T_g, p_g*L, p_co2/p_g)` to the gas emissivity and absorptivity
//! used by the radial exchange solver. The network and its standard scaler
//! are stored as a single JSON document so pretrained models can be shipped
//! next to the crate.

use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NeuralModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Layer {index} expects {expected} inputs, got {got}")]
    ShapeMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("Scaler length {0} does not match network input width {1}")]
    ScalerMismatch(usize, usize),
}

/// Activation functions supported by the surrogate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Tanh,
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, v: f64) -> f64 {
        match self {
            Activation::Tanh => v.tanh(),
            Activation::Relu => v.max(0.0),
            Activation::Linear => v,
        }
    }
}

/// On-disk layout of a layer: row-major weights of shape (outputs, inputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerData {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

/// On-disk layout of the scaler and layer stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralModelData {
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
    pub layers: Vec<LayerData>,
}

struct DenseLayer {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    activation: Activation,
}

/// Compiled feed-forward network with input standardization.
pub struct NeuralModel {
    mean: DVector<f64>,
    std: DVector<f64>,
    layers: Vec<DenseLayer>,
}

impl NeuralModel {
    pub fn from_data(data: NeuralModelData) -> Result<Self, NeuralModelError> {
        let mut layers = Vec::with_capacity(data.layers.len());
        let mut width = data.mean.len();

        for (index, layer) in data.layers.iter().enumerate() {
            let rows = layer.weights.len();
            let cols = layer.weights.first().map(|r| r.len()).unwrap_or(0);
            if cols != width {
                return Err(NeuralModelError::ShapeMismatch {
                    index,
                    expected: width,
                    got: cols,
                });
            }
            let flat: Vec<f64> = layer.weights.iter().flatten().copied().collect();
            layers.push(DenseLayer {
                weights: DMatrix::from_row_slice(rows, cols, &flat),
                bias: DVector::from_vec(layer.bias.clone()),
                activation: layer.activation,
            });
            width = rows;
        }

        if data.mean.len() != data.var.len() {
            return Err(NeuralModelError::ScalerMismatch(
                data.var.len(),
                data.mean.len(),
            ));
        }

        info!(
            "Neural surrogate loaded: {} inputs, {} layers, {} outputs",
            data.mean.len(),
            layers.len(),
            width
        );

        Ok(Self {
            mean: DVector::from_vec(data.mean),
            std: DVector::from_vec(data.var.iter().map(|v| v.sqrt()).collect()),
            layers,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, NeuralModelError> {
        let data: NeuralModelData = serde_json::from_str(text)?;
        Self::from_data(data)
    }

    pub fn from_json_file(path: &std::path::Path) -> Result<Self, NeuralModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Evaluate the network for one input row.
    pub fn predict(&self, input: &[f64]) -> DVector<f64> {
        let mut x = DVector::from_row_slice(input);
        // Standard scaler: (x - mean) / sqrt(var)
        for i in 0..x.len() {
            x[i] = (x[i] - self.mean[i]) / self.std[i];
        }
        for layer in &self.layers {
            let mut y = &layer.weights * x + &layer.bias;
            for v in y.iter_mut() {
                *v = layer.activation.apply(*v);
            }
            x = y;
        }
        x
    }
}

/// Gas radiative properties interface seen by the kiln driver.
///
/// Implementations are stateless pure functions of the per-cell arguments.
#[allow(non_snake_case)]
pub trait GasRadiation {
    /// Return `(emissivity, absorptivity)` per cell given wall and gas
    /// temperatures [K], H2O and CO2 mole fractions and the optical beam
    /// length [m].
    fn properties(
        &self,
        T_w: &[f64],
        T_g: &[f64],
        x_h2o: &[f64],
        x_co2: &[f64],
        beam: &[f64],
    ) -> (Vec<f64>, Vec<f64>);
}

/// Wrapper over the neural network to predict gas properties.
///
/// Inputs are stacked in the trained format: wall temperature, gas
/// temperature, optical depth `p_g*L` and partial pressure ratio
/// `p_co2/p_g` where `p_g = p_h2o + p_co2` in atmospheres.
pub struct RadcalWrapper {
    model: NeuralModel,
}

impl RadcalWrapper {
    pub fn new(model: NeuralModel) -> Self {
        Self { model }
    }

    pub fn from_json_file(path: &std::path::Path) -> Result<Self, NeuralModelError> {
        Ok(Self::new(NeuralModel::from_json_file(path)?))
    }

    #[allow(non_snake_case)]
    fn arguments(T_w: f64, T_g: f64, p_h2o: f64, p_co2: f64, beam: f64) -> [f64; 4] {
        let pg = p_h2o + p_co2;
        let ratio = if pg > 0.0 { p_co2 / pg } else { 0.0 };
        [T_w, T_g, pg * beam, ratio]
    }
}

#[allow(non_snake_case)]
impl GasRadiation for RadcalWrapper {
    fn properties(
        &self,
        T_w: &[f64],
        T_g: &[f64],
        x_h2o: &[f64],
        x_co2: &[f64],
        beam: &[f64],
    ) -> (Vec<f64>, Vec<f64>) {
        let n = T_g.len();
        let mut eps = Vec::with_capacity(n);
        let mut abs = Vec::with_capacity(n);
        for i in 0..n {
            let args = Self::arguments(T_w[i], T_g[i], x_h2o[i], x_co2[i], beam[i]);
            let out = self.model.predict(&args);
            eps.push(out[0].clamp(0.0, 1.0));
            abs.push(out[1].clamp(0.0, 1.0));
        }
        (eps, abs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn passthrough_network() -> NeuralModel {
        // Single linear layer mapping (x2, x3) -> outputs, identity scaler.
        let data = NeuralModelData {
            mean: vec![0.0; 4],
            var: vec![1.0; 4],
            layers: vec![LayerData {
                weights: vec![
                    vec![0.0, 0.0, 0.1, 0.0],
                    vec![0.0, 0.0, 0.0, 0.5],
                ],
                bias: vec![0.0, 0.0],
                activation: Activation::Linear,
            }],
        };
        NeuralModel::from_data(data).unwrap()
    }

    #[test]
    fn test_predict_linear_layer() {
        let model = passthrough_network();
        let out = model.predict(&[1000.0, 1500.0, 2.0, 0.4]);
        assert_relative_eq!(out[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_wrapper_stacks_arguments() {
        let radcal = RadcalWrapper::new(passthrough_network());
        let (eps, abs) = radcal.properties(
            &[800.0],
            &[1200.0],
            &[0.10],
            &[0.10],
            &[1.0],
        );
        // p_g*L = 0.2 and p_co2/p_g = 0.5 through the passthrough weights.
        assert_relative_eq!(eps[0], 0.1 * 0.2, epsilon = 1e-12);
        assert_relative_eq!(abs[0], 0.5 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_validation() {
        let bad = NeuralModelData {
            mean: vec![0.0; 4],
            var: vec![1.0; 4],
            layers: vec![LayerData {
                weights: vec![vec![1.0, 2.0]],
                bias: vec![0.0],
                activation: Activation::Linear,
            }],
        };
        assert!(matches!(
            NeuralModel::from_data(bad),
            Err(NeuralModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let data = NeuralModelData {
            mean: vec![0.0; 4],
            var: vec![1.0; 4],
            layers: vec![LayerData {
                weights: vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
                bias: vec![0.1, -0.1],
                activation: Activation::Tanh,
            }],
        };
        let text = serde_json::to_string(&data).unwrap();
        let model = NeuralModel::from_json_str(&text).unwrap();
        let out = model.predict(&[0.3, 0.2, 0.0, 0.0]);
        assert_relative_eq!(out[0], (0.3_f64 + 0.1).tanh(), epsilon = 1e-12);
        assert_relative_eq!(out[1], (0.2_f64 - 0.1).tanh(), epsilon = 1e-12);
    }
}
