use serde::{Deserialize, Serialize};

use super::types::Child;

pub const STUDY_ABROAD_ANNUAL_SURCHARGE: f64 = 3_000_000.0;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationCourse {
    #[default]
    #[serde(alias = "all-public", alias = "allPublic")]
    AllPublic,
    #[serde(alias = "private-university", alias = "privateUniversity")]
    PrivateUniversity,
    #[serde(alias = "private-from-high", alias = "privateFromHigh")]
    PrivateFromHigh,
    #[serde(alias = "private-from-middle", alias = "privateFromMiddle")]
    PrivateFromMiddle,
    #[serde(alias = "all-private", alias = "allPrivate")]
    AllPrivate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EducationBand {
    Elementary,
    Middle,
    High,
    University,
}

impl EducationBand {
    pub fn for_age(age: u32) -> Option<Self> {
        match age {
            7..=12 => Some(Self::Elementary),
            13..=15 => Some(Self::Middle),
            16..=18 => Some(Self::High),
            19..=22 => Some(Self::University),
            _ => None,
        }
    }

    fn public_cost(self) -> f64 {
        match self {
            Self::Elementary => 450_000.0,
            Self::Middle => 540_000.0,
            Self::High => 510_000.0,
            Self::University => 1_100_000.0,
        }
    }

    fn private_cost(self) -> f64 {
        match self {
            Self::Elementary => 1_670_000.0,
            Self::Middle => 1_440_000.0,
            Self::High => 1_050_000.0,
            Self::University => 1_600_000.0,
        }
    }
}

impl EducationCourse {
    fn is_private(self, band: EducationBand) -> bool {
        use EducationBand::*;
        match self {
            Self::AllPublic => false,
            Self::PrivateUniversity => band == University,
            Self::PrivateFromHigh => matches!(band, High | University),
            Self::PrivateFromMiddle => matches!(band, Middle | High | University),
            Self::AllPrivate => true,
        }
    }

    /// Default annual cost for one band of this course.
    pub fn annual_cost(self, band: EducationBand) -> f64 {
        if self.is_private(band) {
            band.private_cost()
        } else {
            band.public_cost()
        }
    }
}

/// Annual education cost for `child` in the year they are `child_age`.
pub fn annual_education_cost(child: &Child, child_age: u32) -> f64 {
    let Some(band) = EducationBand::for_age(child_age) else {
        return 0.0;
    };

    let custom = child.custom_costs.and_then(|c| match band {
        EducationBand::Elementary => c.elementary,
        EducationBand::Middle => c.middle,
        EducationBand::High => c.high,
        EducationBand::University => c.university,
    });
    let base = custom
        .unwrap_or_else(|| child.education_course.annual_cost(band))
        .max(0.0);

    if child.study_abroad && band == EducationBand::University {
        base + STUDY_ABROAD_ANNUAL_SURCHARGE
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CustomEducationCosts;

    fn child(course: EducationCourse) -> Child {
        Child {
            education_course: course,
            ..Child::default()
        }
    }

    #[test]
    fn bands_cover_school_ages_only() {
        assert_eq!(EducationBand::for_age(6), None);
        assert_eq!(EducationBand::for_age(7), Some(EducationBand::Elementary));
        assert_eq!(EducationBand::for_age(12), Some(EducationBand::Elementary));
        assert_eq!(EducationBand::for_age(13), Some(EducationBand::Middle));
        assert_eq!(EducationBand::for_age(16), Some(EducationBand::High));
        assert_eq!(EducationBand::for_age(22), Some(EducationBand::University));
        assert_eq!(EducationBand::for_age(23), None);
    }

    #[test]
    fn all_public_elementary_cost() {
        let c = child(EducationCourse::AllPublic);
        assert_eq!(annual_education_cost(&c, 10), 450_000.0);
        assert_eq!(annual_education_cost(&c, 25), 0.0);
        assert_eq!(annual_education_cost(&c, 3), 0.0);
    }

    #[test]
    fn course_switches_to_private_at_its_band() {
        let c = child(EducationCourse::PrivateFromHigh);
        assert_eq!(annual_education_cost(&c, 14), 540_000.0);
        assert_eq!(annual_education_cost(&c, 17), 1_050_000.0);
        assert_eq!(annual_education_cost(&c, 20), 1_600_000.0);

        let c = child(EducationCourse::PrivateUniversity);
        assert_eq!(annual_education_cost(&c, 17), 510_000.0);
        assert_eq!(annual_education_cost(&c, 20), 1_600_000.0);
    }

    #[test]
    fn custom_cost_overrides_only_its_phase() {
        let mut c = child(EducationCourse::AllPrivate);
        c.custom_costs = Some(CustomEducationCosts {
            middle: Some(800_000.0),
            ..CustomEducationCosts::default()
        });
        assert_eq!(annual_education_cost(&c, 14), 800_000.0);
        assert_eq!(annual_education_cost(&c, 8), 1_670_000.0);
    }

    #[test]
    fn study_abroad_surcharge_applies_at_university() {
        let mut c = child(EducationCourse::AllPublic);
        c.study_abroad = true;
        assert_eq!(annual_education_cost(&c, 17), 510_000.0);
        assert_eq!(
            annual_education_cost(&c, 19),
            1_100_000.0 + STUDY_ABROAD_ANNUAL_SURCHARGE
        );
        assert_eq!(annual_education_cost(&c, 23), 0.0);
    }

    #[test]
    fn course_names_parse_in_both_spellings() {
        let course: EducationCourse = serde_json::from_str("\"ALL_PUBLIC\"").expect("parse");
        assert_eq!(course, EducationCourse::AllPublic);
        let course: EducationCourse =
            serde_json::from_str("\"private-from-middle\"").expect("parse");
        assert_eq!(course, EducationCourse::PrivateFromMiddle);
    }
}
