use geo::{LineString, MultiPolygon, Polygon};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// All errors as one line
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn validate_ring(ring: &LineString<f64>, location: String, result: &mut ValidationResult) {
    if ring.0.len() < 4 {
        result.add_error(
            location.clone(),
            format!("ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let Some(i) = ring.0.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
        result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
    }
}

fn validate_polygon(polygon: &Polygon<f64>, location: &str, result: &mut ValidationResult) {
    validate_ring(polygon.exterior(), format!("{} exterior", location), result);
    for (i, interior) in polygon.interiors().iter().enumerate() {
        validate_ring(interior, format!("{} interior[{}]", location, i), result);
    }
}

/// Validate a boundary multipolygon: finite coordinates and non-degenerate rings
pub fn validate_multipolygon(multipolygon: &MultiPolygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, polygon) in multipolygon.0.iter().enumerate() {
        validate_polygon(polygon, &format!("Polygon[{}]", i), &mut result);
    }
    result
}
