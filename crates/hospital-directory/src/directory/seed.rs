use super::domain::HospitalDetails;

const SAMPLE_HOSPITALS: [(&str, &str, &str); 12] = [
    ("Aizawl Adventist Hospital", "Mizoram", "Aizawl"),
    ("SDA Medical Centre", "Karnataka", "Bangalore"),
    ("Mattison Memorial Hospital", "Uttar Pradesh", "Hapur"),
    ("Pune Adventist Hospital", "Maharashtra", "Pune"),
    ("Ruby Nelson Memorial Hospital", "Punjab", "Jalandhar"),
    ("SDA Hospital", "Kerala", "Ottapalam"),
    ("Simla Sanitarium & Hospital", "Himachal Pradesh", "Simla"),
    ("SDA Hospital", "Tamil Nadu", "Thanjavur"),
    ("Adventist Mission Hospital", "Meghalaya", "Jengjal"),
    ("GATE Adventist Mission Hospital", "West Bengal", "Falakata"),
    ("SDA College of Nursing", "Kerala", "Ottapalam"),
    ("Future Facility", "TBD", "TBD"),
];

/// Starter hospital network loaded into an empty directory.
pub fn sample_hospitals() -> Vec<HospitalDetails> {
    SAMPLE_HOSPITALS
        .iter()
        .map(|(name, state, city)| HospitalDetails::new(*name, *state, *city))
        .collect()
}
