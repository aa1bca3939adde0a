//! Layout Validation - Rule/Policy Separation
//!
//! Rules produce structured violations from a resolved layout setup.
//! Error-severity violations reject a job before anything is packed;
//! warnings ride along in the report.

use serde::{Deserialize, Serialize};

use crate::catalog::{PaperSpec, PhotoSizeSpec};
use crate::layout::{printable_size, LayoutConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutCheck {
    pub valid: bool,
    pub violations: Vec<LayoutViolation>,
    pub paper_key: String,
}

impl LayoutCheck {
    pub fn has_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error)
    }
}

/// What a job asks for, resolved against the catalog.
#[derive(Debug, Clone)]
pub struct LayoutSetup<'a> {
    pub paper: &'a PaperSpec,
    pub config: &'a LayoutConfig,
    pub photo_sizes: &'a [PhotoSizeSpec],
}

/// A single check over the layout setup.
pub trait LayoutRule {
    fn name(&self) -> &'static str;
    fn check(&self, setup: &LayoutSetup<'_>) -> Vec<LayoutViolation>;
}

// --- Concrete Rules ---

/// Margins and spacing must be non-negative and must leave room to print on.
pub struct PrintableAreaRule;

impl LayoutRule for PrintableAreaRule {
    fn name(&self) -> &'static str {
        "printable_area"
    }

    fn check(&self, setup: &LayoutSetup<'_>) -> Vec<LayoutViolation> {
        let mut violations = vec![];
        let margins = &setup.config.margins;

        if margins.top < 0.0 || margins.bottom < 0.0 || margins.left < 0.0 || margins.right < 0.0
        {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Margins must not be negative".to_string(),
                expected: Some("all margins >= 0 mm".to_string()),
                actual: Some(format!(
                    "top {} bottom {} left {} right {}",
                    margins.top, margins.bottom, margins.left, margins.right
                )),
                remediation: vec!["Set every margin to zero or more".to_string()],
            });
        }

        if setup.config.spacing_mm < 0.0 {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Photo spacing must not be negative".to_string(),
                expected: Some(">= 0 mm".to_string()),
                actual: Some(format!("{} mm", setup.config.spacing_mm)),
                remediation: vec!["Set spacing to zero or more".to_string()],
            });
        }

        let (width, height) = printable_size(setup.paper, margins);
        if width <= 0.0 || height <= 0.0 {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Margins leave no printable area".to_string(),
                expected: Some(format!(
                    "margins inside {} x {} mm",
                    setup.paper.width_mm, setup.paper.height_mm
                )),
                actual: Some(format!("{:.1} x {:.1} mm left", width, height)),
                remediation: vec!["Reduce the margins or pick a larger paper".to_string()],
            });
        }

        violations
    }
}

/// Requested formats must have positive dimensions and should fit the sheet
/// in at least one orientation.
pub struct PhotoFormatRule;

impl LayoutRule for PhotoFormatRule {
    fn name(&self) -> &'static str {
        "photo_format"
    }

    fn check(&self, setup: &LayoutSetup<'_>) -> Vec<LayoutViolation> {
        let mut violations = vec![];
        let (printable_w, printable_h) = printable_size(setup.paper, &setup.config.margins);

        for size in setup.photo_sizes {
            if size.width_mm <= 0.0 || size.height_mm <= 0.0 {
                violations.push(LayoutViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("Photo size {} has non-positive dimensions", size.key),
                    expected: Some("width and height > 0 mm".to_string()),
                    actual: Some(format!("{} x {} mm", size.width_mm, size.height_mm)),
                    remediation: vec!["Fix the catalog entry".to_string()],
                });
                continue;
            }

            let fits_upright = size.width_mm <= printable_w && size.height_mm <= printable_h;
            let fits_sideways = size.height_mm <= printable_w && size.width_mm <= printable_h;
            if !fits_upright && !fits_sideways {
                // The packer will drop these, which is legal; the shop still
                // wants to hear about it before wasting paper.
                violations.push(LayoutViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!(
                        "Photo size {} cannot fit the printable area in any orientation",
                        size.key
                    ),
                    expected: Some(format!("{:.1} x {:.1} mm printable", printable_w, printable_h)),
                    actual: Some(format!("{} x {} mm", size.width_mm, size.height_mm)),
                    remediation: vec![
                        "Pick a larger paper".to_string(),
                        "Reduce the margins".to_string(),
                    ],
                });
            }
        }

        violations
    }
}

/// Border width and color must be drawable.
pub struct BorderRule;

impl LayoutRule for BorderRule {
    fn name(&self) -> &'static str {
        "border"
    }

    fn check(&self, setup: &LayoutSetup<'_>) -> Vec<LayoutViolation> {
        let border = &setup.config.border;
        if !border.enabled {
            return vec![];
        }

        let mut violations = vec![];

        if border.width_mm < 0.0 {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Border width must not be negative".to_string(),
                expected: Some(">= 0 mm".to_string()),
                actual: Some(format!("{} mm", border.width_mm)),
                remediation: vec!["Set the border width to zero or more".to_string()],
            });
        }

        if border.rgba().is_none() {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Border color is not a #rrggbb value".to_string(),
                expected: Some("#rrggbb".to_string()),
                actual: Some(border.color.clone()),
                remediation: vec!["Use a six-digit hex color like #000000".to_string()],
            });
        }

        if border.width_mm > setup.config.spacing_mm {
            violations.push(LayoutViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Border is wider than the photo spacing; neighboring strokes will touch"
                    .to_string(),
                expected: Some(format!("<= {} mm", setup.config.spacing_mm)),
                actual: Some(format!("{} mm", border.width_mm)),
                remediation: vec!["Increase the spacing or thin the border".to_string()],
            });
        }

        violations
    }
}

/// Validator runs every rule and folds the violations into a verdict.
pub struct Validator {
    rules: Vec<Box<dyn LayoutRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PrintableAreaRule),
                Box::new(PhotoFormatRule),
                Box::new(BorderRule),
            ],
        }
    }

    pub fn check(&self, setup: &LayoutSetup<'_>) -> LayoutCheck {
        let mut violations = vec![];
        for rule in &self.rules {
            violations.extend(rule.check(setup));
        }

        let has_errors = violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        LayoutCheck {
            valid: !has_errors,
            violations,
            paper_key: setup.paper.key.clone(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SizeCatalog;
    use crate::layout::Margins;

    fn setup_check(config: &LayoutConfig, size_keys: &[&str]) -> LayoutCheck {
        let catalog = SizeCatalog::builtin();
        let paper = catalog.paper("a4").unwrap().clone();
        let sizes: Vec<_> = size_keys
            .iter()
            .map(|k| catalog.photo_size(k).unwrap().clone())
            .collect();
        Validator::new().check(&LayoutSetup {
            paper: &paper,
            config,
            photo_sizes: &sizes,
        })
    }

    #[test]
    fn default_setup_is_valid() {
        let check = setup_check(&LayoutConfig::default(), &["3x4", "visa_eu"]);
        assert!(check.valid);
        assert!(!check.has_errors());
    }

    #[test]
    fn negative_margins_are_an_error() {
        let config = LayoutConfig {
            margins: Margins::uniform(-1.0),
            ..LayoutConfig::default()
        };
        let check = setup_check(&config, &["3x4"]);
        assert!(!check.valid);
        assert!(check
            .violations
            .iter()
            .any(|v| v.rule == "printable_area" && v.severity == ViolationSeverity::Error));
    }

    #[test]
    fn consuming_margins_leave_no_printable_area() {
        let config = LayoutConfig {
            margins: Margins::uniform(150.0),
            ..LayoutConfig::default()
        };
        let check = setup_check(&config, &["3x4"]);
        assert!(!check.valid);
    }

    #[test]
    fn oversized_format_is_only_a_warning() {
        let catalog = SizeCatalog::builtin();
        let paper = catalog.paper("10x15").unwrap().clone();
        let huge = PhotoSizeSpec {
            key: "poster".to_string(),
            name: "Poster".to_string(),
            width_mm: 300.0,
            height_mm: 400.0,
        };
        let config = LayoutConfig::default();
        let check = Validator::new().check(&LayoutSetup {
            paper: &paper,
            config: &config,
            photo_sizes: std::slice::from_ref(&huge),
        });
        assert!(check.valid);
        assert!(check
            .violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Warning));
    }

    #[test]
    fn bad_border_color_is_an_error() {
        let mut config = LayoutConfig::default();
        config.border.color = "black".to_string();
        let check = setup_check(&config, &["3x4"]);
        assert!(!check.valid);
        assert!(check.violations.iter().any(|v| v.rule == "border"));
    }
}
