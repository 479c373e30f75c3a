#[derive(Debug, Clone, Default)]
pub struct TelemetryLabels {
    pub service: String,
    pub event_type: Option<String>,
    pub outcome: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl TelemetryLabels {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        let mut tags = Vec::with_capacity(3 + self.extra.len());
        tags.push(("service".into(), self.service.clone()));
        if let Some(kind) = &self.event_type {
            tags.push(("event_type".into(), kind.clone()));
        }
        if let Some(outcome) = &self.outcome {
            tags.push(("outcome".into(), outcome.clone()));
        }
        for (key, value) in &self.extra {
            tags.push((key.clone(), value.clone()));
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_include_optional_fields_in_order() {
        let mut labels = TelemetryLabels::new("notion-webhook")
            .with_event_type("page.created")
            .with_outcome("processed");
        labels.extra.push(("entity".into(), "page".into()));
        let tags = labels.tags();
        assert_eq!(tags[0], ("service".into(), "notion-webhook".into()));
        assert_eq!(tags[1], ("event_type".into(), "page.created".into()));
        assert_eq!(tags[2], ("outcome".into(), "processed".into()));
        assert_eq!(tags[3], ("entity".into(), "page".into()));
    }
}
