use std::str::FromStr;

/// Every month label form seen on the published page, checked in this order.
///
/// Substring containment, so `"maj"` also covers `"maja"`; the remaining forms of
/// different months never contain one another.
static MONTH_FORMS: &[(&str, u32)] = &[
    ("styczeń", 1),
    ("styczenia", 1),
    ("stycznia", 1),
    ("luty", 2),
    ("lutego", 2),
    ("marzec", 3),
    ("marca", 3),
    ("kwiecień", 4),
    ("kwietnia", 4),
    ("maj", 5),
    ("maja", 5),
    ("czerwiec", 6),
    ("czerwca", 6),
    ("lipiec", 7),
    ("lipca", 7),
    ("sierpień", 8),
    ("sierpnia", 8),
    ("wrzesień", 9),
    ("września", 9),
    ("październik", 10),
    ("października", 10),
    ("listopad", 11),
    ("listopada", 11),
    ("grudzień", 12),
    ("grudnia", 12),
];

/// Month number (1–12) for the first known form contained in `label`.
/// `label` is expected lowercase already.
pub fn month_from_label(label: &str) -> Option<u32> {
    MONTH_FORMS
        .iter()
        .find(|(form, _)| label.contains(form))
        .map(|&(_, month)| month)
}

/// Naming scheme for months in human-facing output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MonthNames {
    #[default]
    Polish,
    English,
}

impl MonthNames {
    const POLISH: [&'static str; 12] = [
        "styczeń",
        "luty",
        "marzec",
        "kwiecień",
        "maj",
        "czerwiec",
        "lipiec",
        "sierpień",
        "wrzesień",
        "październik",
        "listopad",
        "grudzień",
    ];
    const ENGLISH: [&'static str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    /// Lowercase name for `month` (1–12).
    pub fn name(&self, month: u32) -> Option<&'static str> {
        let idx = usize::try_from(month).ok()?.checked_sub(1)?;
        match self {
            MonthNames::Polish => Self::POLISH.get(idx).copied(),
            MonthNames::English => Self::ENGLISH.get(idx).copied(),
        }
    }

    /// `"Styczeń 2025"`-style heading for a month of a year.
    pub fn heading(&self, year: i32, month: u32) -> String {
        match self.name(month) {
            Some(name) => {
                let mut chars = name.chars();
                let capitalised: String = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                format!("{} {}", capitalised, year)
            }
            None => format!("{:02}/{}", month, year),
        }
    }
}

impl FromStr for MonthNames {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pl" | "polish" => Ok(MonthNames::Polish),
            "en" | "english" => Ok(MonthNames::English),
            other => Err(anyhow::anyhow!("unknown month naming `{}`", other)),
        }
    }
}
