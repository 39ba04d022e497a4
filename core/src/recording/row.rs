use crate::detection::Detection;

/// Zero placeholders emitted between the label and the score. Their meaning
/// belongs to the downstream consumer; they are always written as `0`.
pub const RESERVED_FIELDS: usize = 4;

/// Persisted form of one detection.
///
/// Column layout: `frame_id label 0 0 0 0 score w l h x y z heading.. 0`.
/// Extents precede the center and the center precedes the heading; the
/// consumer of these files depends on that exact order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub frame_id: usize,
    pub label: i64,
    pub score: f32,
    pub extents: [f32; 3],
    pub center: [f32; 3],
    pub heading: Vec<f32>,
}

impl OutputRow {
    pub fn from_detection(frame_id: usize, detection: &Detection<'_>) -> Self {
        Self {
            frame_id,
            label: detection.label,
            score: detection.score,
            extents: detection.extents(),
            center: detection.center(),
            heading: detection.heading(),
        }
    }

    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(2 + RESERVED_FIELDS + 1 + 6 + self.heading.len() + 1);
        fields.push(self.frame_id.to_string());
        fields.push(self.label.to_string());
        fields.extend(std::iter::repeat("0".to_string()).take(RESERVED_FIELDS));
        fields.push(self.score.to_string());
        fields.extend(self.extents.iter().map(f32::to_string));
        fields.extend(self.center.iter().map(f32::to_string));
        fields.extend(self.heading.iter().map(f32::to_string));
        fields.push("0".to_string());
        fields
    }

    /// Box in detector order: center, extents, heading.
    #[cfg(test)]
    pub fn to_box(&self) -> Vec<f32> {
        self.center
            .iter()
            .chain(self.extents.iter())
            .chain(self.heading.iter())
            .copied()
            .collect()
    }
}
