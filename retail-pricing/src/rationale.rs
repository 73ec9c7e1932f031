/// Ordered, appendable audit trail for one recommendation.
///
/// Rendered as: final price statement, core derivation sentence, clamp
/// fragments in the order they fired, then the demand source sentence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rationale {
    core: String,
    adjustments: Vec<String>,
    demand_source: String,
}

impl Rationale {
    pub fn new(core: impl Into<String>) -> Self {
        Self {
            core: core.into(),
            ..Default::default()
        }
    }

    pub fn push_adjustment(&mut self, fragment: impl Into<String>) {
        self.adjustments.push(fragment.into());
    }

    pub fn set_demand_source(&mut self, sentence: impl Into<String>) {
        self.demand_source = sentence.into();
    }

    pub fn render(&self, final_price: f64) -> String {
        let mut out = format!("Recommended Price: {:.2}. {}", final_price, self.core);
        for fragment in &self.adjustments {
            out.push(' ');
            out.push_str(fragment);
        }
        if !self.demand_source.is_empty() {
            out.push(' ');
            out.push_str(&self.demand_source);
        }
        out
    }
}
