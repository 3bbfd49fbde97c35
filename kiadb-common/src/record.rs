use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel written into every field no source has supplied.
pub const UNKNOWN: &str = "N/A";
/// Primary-source status value for plots that have been allotted.
pub const ALLOTTED_STATUS: &str = "Allotted";
/// Primary-source key carrying the plot status.
pub const STATUS_KEY: &str = "plst";
/// Key carrying the human-meaningful plot number, in the primary and status-listing payloads.
pub const PLOT_NUMBER_KEY: &str = "plno";

macro_rules! record_fields {
    ($( $variant:ident => $label:literal, primary: $primary:expr, secondary: [$($sec:literal),*]; )*) => {
        /// Output columns of a [`MergedRecord`], in CSV order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum RecordField {
            $($variant),*
        }

        impl RecordField {
            pub const ALL: &'static [RecordField] = &[$(RecordField::$variant),*];

            /// Column label as written to CSV.
            pub fn label(self) -> &'static str {
                match self {
                    $(RecordField::$variant => $label),*
                }
            }

            /// Key in the primary detail payload, if this source carries the field.
            pub fn primary_key(self) -> Option<&'static str> {
                match self {
                    $(RecordField::$variant => $primary),*
                }
            }

            /// Keys in the secondary payload, tried in order.
            pub fn secondary_keys(self) -> &'static [&'static str] {
                match self {
                    $(RecordField::$variant => &[$($sec),*]),*
                }
            }
        }
    };
}

record_fields! {
    DistrictName => "District Name", primary: Some("dstr"), secondary: [];
    IndustrialArea => "Name of the Industrial Area", primary: Some("nmindar"), secondary: [];
    ProjectApprovedBy => "Project Approved By", primary: Some("prjapr"), secondary: [];
    PlotNumber => "Plot Number", primary: Some(PLOT_NUMBER_KEY), secondary: [];
    PlotCategory => "Plot Category", primary: None, secondary: ["plotcat"];
    PlotSize => "Plot Size", primary: Some("pltar"), secondary: ["plotsize"];
    PlotRate => "Plot Rate", primary: None, secondary: ["plotrate"];
    MaintenanceCharge => "Maintenance Charge", primary: None, secondary: ["mainchare"];
    PlotSurveyNo => "Plot Survey No", primary: None, secondary: ["plotsurno"];
    Reservation => "Reservation", primary: Some("rsvr"), secondary: [];
    AreaInAcres => "Area in acres", primary: Some("pltar"), secondary: ["plotsize"];
    PlotStatus => "Plot Status", primary: Some(STATUS_KEY), secondary: [];
    DateOfAllotment => "Date of Allotment", primary: Some("dtaltm"), secondary: [];
    AllotteeName => "Name of Allottee", primary: Some("nmalt"), secondary: [];
    AllotteePhone => "Allottee Phone", primary: None,
        secondary: ["ownphone", "phone", "contact_no", "mobile", "telephone", "allottee_phone"];
    AllotteeEmail => "Allottee Email", primary: None,
        secondary: ["ownemail", "email", "email_id", "contact_email", "allottee_email"];
    AllotteeAddress => "Address of the Allottee", primary: Some("addalt"), secondary: [];
    NatureOfIndustry => "Nature Of Industry", primary: Some("ntrind"), secondary: [];
    PaymentDueDate => "Due date for payment", primary: Some("ddtpmt"), secondary: [];
    DateOfPossession => "Date of Possession", primary: Some("dtpss"), secondary: [];
    LeaseAgreementDate => "Date of Lease Agreement Executed", primary: Some("dtleagrex"), secondary: [];
    ProductionDeadline => "Stipulated time for commencement of production", primary: Some("stcmprd"), secondary: [];
    ExtensionGranted => "Extension of time Granted", primary: Some("extgrt"), secondary: [];
    ImplementationStatus => "Implementation Status", primary: Some("implst"), secondary: [];
    Notice34B => "Notice under 34-B issued", primary: Some("n34b"), secondary: [];
    Remarks => "Remarks", primary: Some("remark"), secondary: [];
    Ulpin => "ULPIN", primary: Some("ulpin"), secondary: [];
    PreapprovedClearances => "Preapproved Clearances Permissions",
        primary: Some("preappoved_clearances_permissions"), secondary: [];
    PreapprovedClearanceDetails => "Preapproved Clearance Details",
        primary: Some("preappoved_clearances_permissions_details"), secondary: [];
    WaterAvailability => "Water Availability", primary: Some("water_availability"), secondary: [];
    PowerAvailability => "Electric Power Availability", primary: Some("electricpoweravailability"), secondary: [];
    GasPipeline => "Gaspipeline Connectivity", primary: Some("gaspipeline_connectivity"), secondary: [];
    Ofc => "OFC", primary: Some("ofc"), secondary: [];
    Stp => "STP", primary: Some("stp"), secondary: [];
    Wtp => "WTP", primary: Some("wtp"), secondary: [];
    Etp => "ETP", primary: Some("etp"), secondary: [];
}

/// One source's field set for a single code, exactly as fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSourceRecord(Map<String, Value>);

impl RawSourceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON object; any other JSON shape yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Normalised, non-empty value for `key`.
    ///
    /// Strings are trimmed, numbers and booleans rendered, `null` and
    /// nested structures count as absent.
    pub fn value(&self, key: &str) -> Option<String> {
        let rendered = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        (!rendered.is_empty()).then_some(rendered)
    }

    /// First key in `keys` carrying a non-empty value.
    pub fn first_value(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.value(key))
    }

    pub fn status(&self) -> Option<String> {
        self.value(STATUS_KEY)
    }

    pub fn is_allotted(&self) -> bool {
        self.status().as_deref() == Some(ALLOTTED_STATUS)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawSourceRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The canonical output row for one plot code.
///
/// Every [`RecordField`] is always present; fields no source supplied hold [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    plotcode: String,
    values: Vec<String>,
}

impl MergedRecord {
    pub fn new(plotcode: impl Into<String>) -> Self {
        Self {
            plotcode: plotcode.into(),
            values: vec![UNKNOWN.to_string(); RecordField::ALL.len()],
        }
    }

    pub fn plotcode(&self) -> &str {
        &self.plotcode
    }

    pub fn get(&self, field: RecordField) -> &str {
        &self.values[field as usize]
    }

    pub fn is_known(&self, field: RecordField) -> bool {
        self.get(field) != UNKNOWN
    }

    /// Copy every field the primary source supplies. Primary values always win.
    ///
    /// Returns the number of fields written.
    pub fn apply_primary(&mut self, raw: &RawSourceRecord) -> usize {
        let mut written = 0;
        for &field in RecordField::ALL {
            let Some(key) = field.primary_key() else {
                continue;
            };
            if let Some(value) = raw.value(key) {
                self.values[field as usize] = value;
                written += 1;
            }
        }
        written
    }

    /// Fill fields still unknown from the secondary source.
    ///
    /// Returns the number of fields written.
    pub fn apply_secondary(&mut self, raw: &RawSourceRecord) -> usize {
        let mut written = 0;
        for &field in RecordField::ALL {
            if self.is_known(field) {
                continue;
            }
            if let Some(value) = raw.first_value(field.secondary_keys()) {
                self.values[field as usize] = value;
                written += 1;
            }
        }
        written
    }

    /// Plot number used to reconcile against the status listing.
    pub fn plot_number(&self) -> Option<&str> {
        self.is_known(RecordField::PlotNumber)
            .then(|| self.get(RecordField::PlotNumber))
    }

    /// True when a phone number or an email address is known.
    pub fn is_contactable(&self) -> bool {
        self.is_known(RecordField::AllotteePhone) || self.is_known(RecordField::AllotteeEmail)
    }

    pub fn csv_header() -> Vec<&'static str> {
        std::iter::once("Plotcode")
            .chain(RecordField::ALL.iter().map(|f| f.label()))
            .collect()
    }

    pub fn csv_row(&self) -> Vec<&str> {
        std::iter::once(self.plotcode.as_str())
            .chain(self.values.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSourceRecord {
        RawSourceRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_new_record_has_every_field_unknown() {
        let record = MergedRecord::new("Z0657201630001");
        for &field in RecordField::ALL {
            assert_eq!(record.get(field), UNKNOWN);
        }
        assert_eq!(record.csv_row().len(), MergedRecord::csv_header().len());
    }

    #[test]
    fn test_primary_wins_over_secondary() {
        let mut record = MergedRecord::new("Z0657201630001");
        record.apply_primary(&raw(json!({"pltar": "2.5", "plno": "P1"})));
        record.apply_secondary(&raw(json!({"plotsize": "9.9", "plotrate": 1200})));

        assert_eq!(record.get(RecordField::PlotSize), "2.5");
        assert_eq!(record.get(RecordField::AreaInAcres), "2.5");
        assert_eq!(record.get(RecordField::PlotRate), "1200");
        assert_eq!(record.plot_number(), Some("P1"));
    }

    #[test]
    fn test_secondary_fills_only_unknown_fields() {
        let mut record = MergedRecord::new("Z0657201630001");
        record.apply_primary(&raw(json!({"pltar": "", "plno": null})));
        record.apply_secondary(&raw(json!({"plotsize": "9.9"})));

        assert_eq!(record.get(RecordField::PlotSize), "9.9");
        assert_eq!(record.get(RecordField::PlotNumber), UNKNOWN);
        assert_eq!(record.plot_number(), None);
    }

    #[test]
    fn test_secondary_keys_tried_in_order() {
        let mut record = MergedRecord::new("Z0657201630001");
        record.apply_secondary(&raw(json!({
            "mobile": "9876543210",
            "phone": " ",
            "email_id": "a@b.in",
            "ownemail": "owner@b.in",
        })));
        assert_eq!(record.get(RecordField::AllotteePhone), "9876543210");
        assert_eq!(record.get(RecordField::AllotteeEmail), "owner@b.in");
        assert!(record.is_contactable());
    }

    #[test]
    fn test_allotted_status_is_exact() {
        assert!(raw(json!({"plst": "Allotted"})).is_allotted());
        assert!(!raw(json!({"plst": "Vacant"})).is_allotted());
        assert!(!raw(json!({"plst": "allotted"})).is_allotted());
        assert!(!raw(json!({})).is_allotted());
    }

    #[test]
    fn test_plot_number_and_status_columns_use_source_keys() {
        assert_eq!(RecordField::PlotNumber.primary_key(), Some(PLOT_NUMBER_KEY));
        assert_eq!(RecordField::PlotStatus.primary_key(), Some(STATUS_KEY));

        let mut record = MergedRecord::new("Z0657201630001");
        record.apply_primary(&raw(json!({PLOT_NUMBER_KEY: "P7", STATUS_KEY: "Allotted"})));
        assert_eq!(record.plot_number(), Some("P7"));
        assert_eq!(record.get(RecordField::PlotStatus), "Allotted");
    }

    #[test]
    fn test_non_object_values_are_not_records() {
        assert!(RawSourceRecord::from_value(json!([1, 2])).is_none());
        assert!(RawSourceRecord::from_value(json!("Wrong Input")).is_none());
    }
}
