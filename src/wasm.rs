//! WASM bindings for Nodal Core.
//!
//! This module provides JavaScript-friendly bindings for browser-based
//! schematic editors. Snapshots go in and analyses come out as JSON strings.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmEngine } from 'nodal_core';
//!
//! await init();
//!
//! const engine = new WasmEngine();
//! const analysis = JSON.parse(engine.analyze(JSON.stringify({
//!   elements: [
//!     { id: "V1", kind: "VoltageSource", value: 5, terminals: ["V1.n", "V1.p"] },
//!     { id: "R1", kind: "Resistor", value: 1000, terminals: ["R1.a", "R1.b"] },
//!   ],
//!   connections: [
//!     { terminalA: "V1.p", terminalB: "R1.b" },
//!     { terminalA: "R1.a", terminalB: "V1.n" },
//!   ],
//! })));
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::Schematic;
use crate::error::NodalError;
use crate::solver::{Engine, EngineConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: NodalError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible analysis engine.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine with default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        WasmEngine {
            engine: Engine::new(),
        }
    }

    /// Create an engine with custom leakage and saturation settings.
    ///
    /// # Arguments
    /// * `leakage_conductance` - Conductance from every node to ground (default: 1e-12)
    /// * `saturation_threshold` - Current flagged as a short circuit (default: 9999)
    #[wasm_bindgen]
    pub fn with_config(
        leakage_conductance: f64,
        saturation_threshold: f64,
    ) -> Result<WasmEngine, JsValue> {
        let config = EngineConfig::new()
            .with_leakage_conductance(leakage_conductance)
            .with_saturation_threshold(saturation_threshold);
        let engine = Engine::with_config(config).map_err(to_js)?;
        Ok(WasmEngine { engine })
    }

    /// Analyze a schematic snapshot given as JSON.
    ///
    /// # Returns
    /// The analysis as a JSON string, or an error if the snapshot is malformed.
    #[wasm_bindgen]
    pub fn analyze(&self, schematic_json: &str) -> Result<String, JsValue> {
        let schematic = Schematic::from_json(schematic_json).map_err(to_js)?;
        let analysis = self.engine.analyze(&schematic);
        serde_json::to_string(&analysis)
            .map_err(|e| to_js(NodalError::WasmError { message: e.to_string() }))
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
