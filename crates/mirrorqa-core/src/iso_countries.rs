//! Bundled ISO 3166-1 alpha-2 country code/name table.
//!
//! Used to validate and name-resolve country codes supplied by `create-worker`,
//! `update-worker` and `PUT /workers/{id}/countries` without a network call.

pub struct IsoCountry {
    pub code: &'static str,
    pub name: &'static str,
}

pub const COUNTRIES: &[IsoCountry] = &[
    IsoCountry { code: "af", name: "Afghanistan" },
    IsoCountry { code: "al", name: "Albania" },
    IsoCountry { code: "dz", name: "Algeria" },
    IsoCountry { code: "ar", name: "Argentina" },
    IsoCountry { code: "am", name: "Armenia" },
    IsoCountry { code: "au", name: "Australia" },
    IsoCountry { code: "at", name: "Austria" },
    IsoCountry { code: "az", name: "Azerbaijan" },
    IsoCountry { code: "bd", name: "Bangladesh" },
    IsoCountry { code: "by", name: "Belarus" },
    IsoCountry { code: "be", name: "Belgium" },
    IsoCountry { code: "bj", name: "Benin" },
    IsoCountry { code: "bo", name: "Bolivia" },
    IsoCountry { code: "ba", name: "Bosnia and Herzegovina" },
    IsoCountry { code: "bw", name: "Botswana" },
    IsoCountry { code: "br", name: "Brazil" },
    IsoCountry { code: "bg", name: "Bulgaria" },
    IsoCountry { code: "bf", name: "Burkina Faso" },
    IsoCountry { code: "kh", name: "Cambodia" },
    IsoCountry { code: "cm", name: "Cameroon" },
    IsoCountry { code: "ca", name: "Canada" },
    IsoCountry { code: "cl", name: "Chile" },
    IsoCountry { code: "cn", name: "China" },
    IsoCountry { code: "co", name: "Colombia" },
    IsoCountry { code: "cr", name: "Costa Rica" },
    IsoCountry { code: "hr", name: "Croatia" },
    IsoCountry { code: "cu", name: "Cuba" },
    IsoCountry { code: "cy", name: "Cyprus" },
    IsoCountry { code: "cz", name: "Czechia" },
    IsoCountry { code: "cd", name: "Congo (Democratic Republic)" },
    IsoCountry { code: "dk", name: "Denmark" },
    IsoCountry { code: "do", name: "Dominican Republic" },
    IsoCountry { code: "ec", name: "Ecuador" },
    IsoCountry { code: "eg", name: "Egypt" },
    IsoCountry { code: "ee", name: "Estonia" },
    IsoCountry { code: "et", name: "Ethiopia" },
    IsoCountry { code: "fi", name: "Finland" },
    IsoCountry { code: "fr", name: "France" },
    IsoCountry { code: "ge", name: "Georgia" },
    IsoCountry { code: "de", name: "Germany" },
    IsoCountry { code: "gh", name: "Ghana" },
    IsoCountry { code: "gr", name: "Greece" },
    IsoCountry { code: "gt", name: "Guatemala" },
    IsoCountry { code: "hn", name: "Honduras" },
    IsoCountry { code: "hk", name: "Hong Kong" },
    IsoCountry { code: "hu", name: "Hungary" },
    IsoCountry { code: "is", name: "Iceland" },
    IsoCountry { code: "in", name: "India" },
    IsoCountry { code: "id", name: "Indonesia" },
    IsoCountry { code: "ir", name: "Iran" },
    IsoCountry { code: "iq", name: "Iraq" },
    IsoCountry { code: "ie", name: "Ireland" },
    IsoCountry { code: "il", name: "Israel" },
    IsoCountry { code: "it", name: "Italy" },
    IsoCountry { code: "ci", name: "Cote d'Ivoire" },
    IsoCountry { code: "jm", name: "Jamaica" },
    IsoCountry { code: "jp", name: "Japan" },
    IsoCountry { code: "jo", name: "Jordan" },
    IsoCountry { code: "kz", name: "Kazakhstan" },
    IsoCountry { code: "ke", name: "Kenya" },
    IsoCountry { code: "kr", name: "Korea (Republic of)" },
    IsoCountry { code: "kw", name: "Kuwait" },
    IsoCountry { code: "la", name: "Lao People's Democratic Republic" },
    IsoCountry { code: "lv", name: "Latvia" },
    IsoCountry { code: "lb", name: "Lebanon" },
    IsoCountry { code: "lr", name: "Liberia" },
    IsoCountry { code: "ly", name: "Libya" },
    IsoCountry { code: "lt", name: "Lithuania" },
    IsoCountry { code: "lu", name: "Luxembourg" },
    IsoCountry { code: "mg", name: "Madagascar" },
    IsoCountry { code: "mw", name: "Malawi" },
    IsoCountry { code: "my", name: "Malaysia" },
    IsoCountry { code: "ml", name: "Mali" },
    IsoCountry { code: "mt", name: "Malta" },
    IsoCountry { code: "mx", name: "Mexico" },
    IsoCountry { code: "md", name: "Moldova" },
    IsoCountry { code: "mn", name: "Mongolia" },
    IsoCountry { code: "me", name: "Montenegro" },
    IsoCountry { code: "ma", name: "Morocco" },
    IsoCountry { code: "mz", name: "Mozambique" },
    IsoCountry { code: "mm", name: "Myanmar" },
    IsoCountry { code: "na", name: "Namibia" },
    IsoCountry { code: "np", name: "Nepal" },
    IsoCountry { code: "nl", name: "Netherlands" },
    IsoCountry { code: "nz", name: "New Zealand" },
    IsoCountry { code: "ni", name: "Nicaragua" },
    IsoCountry { code: "ne", name: "Niger" },
    IsoCountry { code: "ng", name: "Nigeria" },
    IsoCountry { code: "no", name: "Norway" },
    IsoCountry { code: "om", name: "Oman" },
    IsoCountry { code: "pk", name: "Pakistan" },
    IsoCountry { code: "pa", name: "Panama" },
    IsoCountry { code: "py", name: "Paraguay" },
    IsoCountry { code: "pe", name: "Peru" },
    IsoCountry { code: "ph", name: "Philippines" },
    IsoCountry { code: "pl", name: "Poland" },
    IsoCountry { code: "pt", name: "Portugal" },
    IsoCountry { code: "qa", name: "Qatar" },
    IsoCountry { code: "ro", name: "Romania" },
    IsoCountry { code: "ru", name: "Russian Federation" },
    IsoCountry { code: "rw", name: "Rwanda" },
    IsoCountry { code: "sa", name: "Saudi Arabia" },
    IsoCountry { code: "sn", name: "Senegal" },
    IsoCountry { code: "rs", name: "Serbia" },
    IsoCountry { code: "sg", name: "Singapore" },
    IsoCountry { code: "sk", name: "Slovakia" },
    IsoCountry { code: "si", name: "Slovenia" },
    IsoCountry { code: "so", name: "Somalia" },
    IsoCountry { code: "za", name: "South Africa" },
    IsoCountry { code: "es", name: "Spain" },
    IsoCountry { code: "lk", name: "Sri Lanka" },
    IsoCountry { code: "sd", name: "Sudan" },
    IsoCountry { code: "se", name: "Sweden" },
    IsoCountry { code: "ch", name: "Switzerland" },
    IsoCountry { code: "sy", name: "Syrian Arab Republic" },
    IsoCountry { code: "tw", name: "Taiwan" },
    IsoCountry { code: "tz", name: "Tanzania" },
    IsoCountry { code: "th", name: "Thailand" },
    IsoCountry { code: "tg", name: "Togo" },
    IsoCountry { code: "tn", name: "Tunisia" },
    IsoCountry { code: "tr", name: "Turkey" },
    IsoCountry { code: "ug", name: "Uganda" },
    IsoCountry { code: "ua", name: "Ukraine" },
    IsoCountry { code: "ae", name: "United Arab Emirates" },
    IsoCountry { code: "gb", name: "United Kingdom" },
    IsoCountry { code: "us", name: "United States" },
    IsoCountry { code: "uy", name: "Uruguay" },
    IsoCountry { code: "uz", name: "Uzbekistan" },
    IsoCountry { code: "ve", name: "Venezuela" },
    IsoCountry { code: "vn", name: "Viet Nam" },
    IsoCountry { code: "ye", name: "Yemen" },
    IsoCountry { code: "zm", name: "Zambia" },
    IsoCountry { code: "zw", name: "Zimbabwe" },
];

/// Look up a country by lowercase 2-letter code.
pub fn lookup(code: &str) -> Option<&'static IsoCountry> {
    let code = code.to_ascii_lowercase();
    COUNTRIES.iter().find(|c| c.code == code)
}

pub fn is_valid(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) && lookup(code).is_some()
}
