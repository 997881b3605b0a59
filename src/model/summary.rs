use std::fmt::Write;

use super::Model;

const LABEL_WIDTH: usize = 29;
const SHAPE_WIDTH: usize = 20;
const PARAMS_WIDTH: usize = 16;

impl Model {
    /// Keras-style table of the model's layers.
    pub fn summary(&self) -> String {
        let labels = self.layers.iter().map(|layer| format!("{} ({})", layer.name, layer.kind)).collect::<Vec<_>>();

        // long layer names widen the first column instead of running into the shapes
        let label_width = labels.iter().map(|label| label.len() + 1).max().unwrap_or(0).max(LABEL_WIDTH);
        let width = label_width + SHAPE_WIDTH + PARAMS_WIDTH;

        let mut out = String::new();
        let rule = "_".repeat(width);
        let thick = "=".repeat(width);

        let _ = writeln!(out, "Model: \"{}\"", self.name);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{: <label_width$}{: <SHAPE_WIDTH$}{}", "Layer (type)", "Output Shape", "Param #");
        let _ = writeln!(out, "{thick}");

        for (idx, (layer, label)) in self.layers.iter().zip(&labels).enumerate() {
            let shape = format!("(None, {})", layer.units);
            let _ = writeln!(out, "{label: <label_width$}{shape: <SHAPE_WIDTH$}{}", layer.params);

            if idx + 1 < self.layers.len() {
                let _ = writeln!(out, "{rule}");
            }
        }

        let total = self.num_params();
        let _ = writeln!(out, "{thick}");
        let _ = writeln!(out, "Total params: {total}");
        let _ = writeln!(out, "Trainable params: {total}");
        let _ = writeln!(out, "Non-trainable params: 0");
        let _ = write!(out, "{rule}");

        out
    }
}
