//! CRS transformation of boundary geometries

use geo::{coord, BoundingRect, Coord, MapCoords, MultiPolygon, Rect};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::Crs;
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// Coordinate transformation between two CRS.
///
/// Same-CRS reprojectors never touch PROJ and return coordinates untouched.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    proj: Option<Proj>,
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        if crs_match(from, to) {
            return Ok(Self { from: from.clone(), to: to.clone(), proj: None });
        }

        let proj = Proj::new_known_crs(&from.authority_string(), &to.authority_string(), None)
            .map_err(|e| JnrError::Projection {
                from: from.epsg,
                to: to.epsg,
                reason: format!("failed to create projection: {}", e),
            })?;

        Ok(Self { from: from.clone(), to: to.clone(), proj: Some(proj) })
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    pub fn source(&self) -> &Crs {
        &self.from
    }

    pub fn target(&self) -> &Crs {
        &self.to
    }

    fn convert(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let Some(proj) = &self.proj else {
            return Ok(c);
        };
        let (x, y) = proj.convert((c.x, c.y)).map_err(|e| JnrError::Projection {
            from: self.from.epsg,
            to: self.to.epsg,
            reason: format!("({}, {}): {}", c.x, c.y, e),
        })?;
        Ok(coord! { x: x, y: y })
    }

    /// Transform every vertex of a multipolygon
    pub fn multipolygon(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c| self.convert(c))
    }

    /// Transform a rectangle by its four corners and return the enclosing rectangle
    pub fn rect(&self, rect: &Rect<f64>) -> Result<Rect<f64>> {
        if self.is_identity() {
            return Ok(*rect);
        }
        let corners = rect.to_polygon().try_map_coords(|c| self.convert(c))?;
        corners.bounding_rect().ok_or_else(|| JnrError::Projection {
            from: self.from.epsg,
            to: self.to.epsg,
            reason: "rectangle collapsed during projection".to_string(),
        })
    }
}

/// Reproject a multipolygon from one CRS to another
pub fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    from_crs: &Crs,
    to_crs: &Crs,
) -> Result<MultiPolygon<f64>> {
    Reprojector::new(from_crs, to_crs)?.multipolygon(geometry)
}
