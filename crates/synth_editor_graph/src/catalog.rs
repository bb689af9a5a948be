// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in synthesizer node templates.
//!
//! The output of every node can be read as a function `f`; downstream
//! nodes sample it as `y = f(t)`.

use crate::node::{NodeRegistry, NodeTemplate};

/// Create the synthesizer node registry
pub fn create_synth_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    let templates = [
        NodeTemplate::new("sinwave", "Sinewave")
            .with_input("phase", "phase")
            .with_output("output", "output")
            .with_field("frequency", "Frequency", 440),
        NodeTemplate::new("linear", "Linear")
            .with_input("phase", "phase")
            .with_output("output", "output")
            .with_field("angle", "Angle", 10),
        NodeTemplate::new("sawtooth", "Sawtooth")
            .with_input("phase", "phase")
            .with_output("output", "output")
            .with_field("frequency", "Frequency", 440)
            .with_field("alpha", "Alpha", 0.1),
        NodeTemplate::new("fft", "FFT")
            .with_input("ampl", "ampl.")
            .with_input("phase", "phase")
            .with_output("output", "output")
            .with_field("length", "Length", 1.0),
    ];
    for template in templates {
        if let Err(e) = registry.register(template) {
            tracing::error!("Skipping built-in template: {e}");
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeLayout;
    use crate::node::{NodeId, TemplateLookup};
    use egui::Pos2;

    #[test]
    fn test_every_template_instantiates_unconnected() {
        let registry = create_synth_registry();
        assert_eq!(registry.len(), 4);
        for template in registry.templates() {
            let node = template.instantiate(NodeId::new("node0"), Pos2::ZERO, &NodeLayout::default());
            assert_eq!(node.inputs().len(), template.inputs.len());
            assert_eq!(node.outputs().len(), template.outputs.len());
            assert!(node.ports().all(|p| !p.is_connected()));
            assert_eq!(node.fields().count(), template.config_fields.len());
        }
        assert!(registry.lookup_template("fft").unwrap().has_input("ampl"));
    }
}
