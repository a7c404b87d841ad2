//! Rendering a flat record into the NCPDP `Message` document.
//!
//! Element order is fixed:
//! - `Header` (`MessageID`, `Timestamp`) before `Body`
//! - `Patient`: `ID` attribute, `FirstName`, `LastName`, `DateOfBirth`, `Address`?, `Phone`?
//! - `Prescriber`: `ID`, `NPI`, `DEA`?, `FirstName`, `LastName`, `Address`?, `Phone`?
//! - `Medication`: `NDC`, `Name`, `Quantity`, `Refills`?, `Dosage`?, `Directions`?
//! - `Insurance`? last
//!
//! Every value, attributes included, goes through [`escape`] and is written pre-escaped so
//! the writer does not apply its own entity rules on top. A value holding a character that
//! XML cannot carry fails the render with [`NcpdpError::ForbiddenCharacter`].

use crate::escape::{escape, first_forbidden_char};
use crate::sections::{non_empty, AddressFields, InsuranceFields};
use crate::{
    MessageId, NcpdpError, NcpdpResult, DEFAULT_PATIENT_ID, DEFAULT_PRESCRIBER_ID,
    DEFAULT_QUANTITY,
};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rx_types::{FlatPrescriptionRecord, DATE_FORMAT};

/// Render `record` as a complete message document issued at `now`.
pub(crate) fn render_message(
    record: &FlatPrescriptionRecord,
    now: DateTime<Utc>,
) -> NcpdpResult<String> {
    let message_id = MessageId::from_time(now);
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let date_written = resolve_date_written(record, now);

    let mut w = MessageWriter::new();
    w.declaration()?;
    w.open("Message")?;

    w.open("Header")?;
    w.element("MessageID", &message_id.to_string())?;
    w.element("Timestamp", &timestamp)?;
    w.close("Header")?;

    w.open("Body")?;
    w.open_with_attribute("Prescription", "DateWritten", &date_written)?;
    write_patient(&mut w, record)?;
    write_prescriber(&mut w, record)?;
    write_medication(&mut w, record)?;
    write_insurance(&mut w, InsuranceFields::from_record(record))?;
    w.close("Prescription")?;
    w.close("Body")?;

    w.close("Message")?;
    let xml = w.finish()?;

    tracing::debug!(
        message_id = %message_id,
        bytes = xml.len(),
        "rendered prescription message"
    );
    Ok(xml)
}

fn write_patient(w: &mut MessageWriter, record: &FlatPrescriptionRecord) -> NcpdpResult<()> {
    w.open_with_attribute(
        "Patient",
        "ID",
        resolve_id(&record.patient_id, DEFAULT_PATIENT_ID),
    )?;
    w.element("FirstName", &record.patient_first_name)?;
    w.element("LastName", &record.patient_last_name)?;
    w.element("DateOfBirth", &record.patient_date_of_birth)?;
    write_address(w, AddressFields::patient(record))?;
    w.optional_element("Phone", &record.patient_phone)?;
    w.close("Patient")
}

fn write_prescriber(w: &mut MessageWriter, record: &FlatPrescriptionRecord) -> NcpdpResult<()> {
    w.open_with_attribute(
        "Prescriber",
        "ID",
        resolve_id(&record.prescriber_id, DEFAULT_PRESCRIBER_ID),
    )?;
    w.element("NPI", &record.prescriber_npi)?;
    w.optional_element("DEA", &record.prescriber_dea)?;
    w.element("FirstName", &record.prescriber_first_name)?;
    w.element("LastName", &record.prescriber_last_name)?;
    write_address(w, AddressFields::prescriber(record))?;
    w.optional_element("Phone", &record.prescriber_phone)?;
    w.close("Prescriber")
}

fn write_medication(w: &mut MessageWriter, record: &FlatPrescriptionRecord) -> NcpdpResult<()> {
    w.open("Medication")?;
    w.element("NDC", &record.medication_ndc)?;
    w.element("Name", &record.medication_name)?;
    w.element(
        "Quantity",
        &resolve_quantity(&record.medication_quantity).to_string(),
    )?;
    w.optional_element("Refills", &record.medication_refills)?;
    w.optional_element("Dosage", &record.medication_dosage)?;
    w.optional_element("Directions", &record.medication_directions)?;
    w.close("Medication")
}

fn write_address(w: &mut MessageWriter, address: AddressFields<'_>) -> NcpdpResult<()> {
    if !address.is_present() {
        return Ok(());
    }
    w.open("Address")?;
    w.optional_element("Street", address.street)?;
    w.optional_element("City", address.city)?;
    w.optional_element("State", address.state)?;
    w.optional_element("ZipCode", address.zip_code)?;
    w.close("Address")
}

fn write_insurance(w: &mut MessageWriter, insurance: InsuranceFields<'_>) -> NcpdpResult<()> {
    if !insurance.is_present() {
        return Ok(());
    }
    w.open("Insurance")?;
    w.optional_element("BIN", insurance.bin)?;
    w.optional_element("PCN", insurance.pcn)?;
    w.optional_element("GroupID", insurance.group_id)?;
    w.optional_element("MemberID", insurance.member_id)?;
    w.optional_element("PlanName", insurance.plan_name)?;
    w.close("Insurance")
}

fn resolve_id<'a>(value: &'a str, default: &'a str) -> &'a str {
    non_empty(value).unwrap_or(default)
}

/// Quantity as emitted: the record's whole number, or [`DEFAULT_QUANTITY`] when empty or
/// not a non-negative whole number.
fn resolve_quantity(value: &str) -> u32 {
    value.trim().parse::<u32>().unwrap_or(DEFAULT_QUANTITY)
}

fn resolve_date_written(record: &FlatPrescriptionRecord, now: DateTime<Utc>) -> String {
    match non_empty(&record.date_written) {
        Some(date) => date.to_string(),
        None => now.format(DATE_FORMAT).to_string(),
    }
}

fn reject_forbidden(element: &str, value: &str) -> NcpdpResult<()> {
    match first_forbidden_char(value) {
        Some((_, c)) => Err(NcpdpError::ForbiddenCharacter {
            element: element.to_string(),
            code: c as u32,
        }),
        None => Ok(()),
    }
}

/// Thin event-writer wrapper that escapes every value itself.
struct MessageWriter {
    xml: Writer<Vec<u8>>,
}

impl MessageWriter {
    fn new() -> Self {
        Self {
            xml: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn declaration(&mut self) -> NcpdpResult<()> {
        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn open(&mut self, name: &str) -> NcpdpResult<()> {
        self.xml.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn open_with_attribute(&mut self, name: &str, key: &str, value: &str) -> NcpdpResult<()> {
        reject_forbidden(name, value)?;
        let escaped = escape(value);
        let mut start = BytesStart::new(name);
        // Raw-bytes attributes are written verbatim; the value is already escaped.
        start.push_attribute(Attribute::from((key.as_bytes(), escaped.as_bytes())));
        self.xml.write_event(Event::Start(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> NcpdpResult<()> {
        self.xml.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes `<name>value</name>`, even when `value` is empty.
    fn element(&mut self, name: &str, value: &str) -> NcpdpResult<()> {
        reject_forbidden(name, value)?;
        self.open(name)?;
        self.xml
            .write_event(Event::Text(BytesText::from_escaped(escape(value))))?;
        self.close(name)
    }

    /// Writes the element only when `value` is non-empty.
    fn optional_element(&mut self, name: &str, value: &str) -> NcpdpResult<()> {
        match non_empty(value) {
            Some(value) => self.element(name, value),
            None => Ok(()),
        }
    }

    fn finish(self) -> NcpdpResult<String> {
        Ok(String::from_utf8(self.xml.into_inner())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-01-15T10:30:00Z"
            .parse::<DateTime<Utc>>()
            .expect("valid timestamp")
    }

    fn humira_record() -> FlatPrescriptionRecord {
        FlatPrescriptionRecord {
            patient_id: "PAT001".into(),
            patient_first_name: "John".into(),
            patient_last_name: "Doe".into(),
            patient_date_of_birth: "1980-05-15".into(),
            patient_street: "123 Main St".into(),
            patient_city: "New York".into(),
            patient_state: "NY".into(),
            patient_zip_code: "10001".into(),
            patient_phone: "555-1234".into(),
            prescriber_id: "PRES001".into(),
            prescriber_npi: "1234567890".into(),
            prescriber_dea: "AB1234567".into(),
            prescriber_first_name: "Jane".into(),
            prescriber_last_name: "Smith".into(),
            prescriber_street: "456 Medical Blvd".into(),
            prescriber_city: "New York".into(),
            prescriber_state: "NY".into(),
            prescriber_zip_code: "10002".into(),
            prescriber_phone: "555-5678".into(),
            medication_ndc: "00002-7510-02".into(),
            medication_name: "Humira".into(),
            medication_quantity: "2".into(),
            medication_refills: "3".into(),
            medication_dosage: "40mg".into(),
            medication_directions: "Take 2 injections every 2 weeks".into(),
            date_written: "2024-01-15".into(),
            insurance_bin: "004682".into(),
            insurance_pcn: "CNRX".into(),
            insurance_group_id: "".into(),
            insurance_member_id: "MEM123456".into(),
            insurance_plan_name: "Blue Cross Blue Shield".into(),
        }
    }

    #[test]
    fn renders_complete_message() {
        let xml = render_message(&humira_record(), now()).expect("render");

        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<Message>
  <Header>
    <MessageID>MSG1705314600000</MessageID>
    <Timestamp>2024-01-15T10:30:00.000Z</Timestamp>
  </Header>
  <Body>
    <Prescription DateWritten="2024-01-15">
      <Patient ID="PAT001">
        <FirstName>John</FirstName>
        <LastName>Doe</LastName>
        <DateOfBirth>1980-05-15</DateOfBirth>
        <Address>
          <Street>123 Main St</Street>
          <City>New York</City>
          <State>NY</State>
          <ZipCode>10001</ZipCode>
        </Address>
        <Phone>555-1234</Phone>
      </Patient>
      <Prescriber ID="PRES001">
        <NPI>1234567890</NPI>
        <DEA>AB1234567</DEA>
        <FirstName>Jane</FirstName>
        <LastName>Smith</LastName>
        <Address>
          <Street>456 Medical Blvd</Street>
          <City>New York</City>
          <State>NY</State>
          <ZipCode>10002</ZipCode>
        </Address>
        <Phone>555-5678</Phone>
      </Prescriber>
      <Medication>
        <NDC>00002-7510-02</NDC>
        <Name>Humira</Name>
        <Quantity>2</Quantity>
        <Refills>3</Refills>
        <Dosage>40mg</Dosage>
        <Directions>Take 2 injections every 2 weeks</Directions>
      </Medication>
      <Insurance>
        <BIN>004682</BIN>
        <PCN>CNRX</PCN>
        <MemberID>MEM123456</MemberID>
        <PlanName>Blue Cross Blue Shield</PlanName>
      </Insurance>
    </Prescription>
  </Body>
</Message>"#;

        assert_eq!(xml, expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let record = humira_record();
        assert_eq!(
            render_message(&record, now()).expect("first"),
            render_message(&record, now()).expect("second")
        );
    }

    #[test]
    fn omits_address_when_all_fields_blank() {
        let mut record = humira_record();
        record.patient_street.clear();
        record.patient_city.clear();
        record.patient_state.clear();
        record.patient_zip_code.clear();

        let xml = render_message(&record, now()).expect("render");
        let patient = section(&xml, "Patient");
        assert!(!patient.contains("<Address>"));
        // The prescriber address is unaffected.
        assert!(section(&xml, "Prescriber").contains("<Address>"));
    }

    #[test]
    fn address_with_only_city_has_only_city() {
        let mut record = FlatPrescriptionRecord::default();
        record.patient_city = "Chicago".into();

        let xml = render_message(&record, now()).expect("render");
        let address = section(section(&xml, "Patient"), "Address");
        assert!(address.contains("<City>Chicago</City>"));
        assert!(!address.contains("<Street>"));
        assert!(!address.contains("<State>"));
        assert!(!address.contains("<ZipCode>"));
    }

    #[test]
    fn omits_insurance_when_all_fields_empty() {
        let mut record = humira_record();
        record.insurance_bin.clear();
        record.insurance_pcn.clear();
        record.insurance_member_id.clear();
        record.insurance_plan_name.clear();

        let xml = render_message(&record, now()).expect("render");
        assert!(!xml.contains("<Insurance>"));
    }

    #[test]
    fn whitespace_only_values_are_emitted_verbatim() {
        let mut record = FlatPrescriptionRecord::default();
        record.patient_id = " ".into();
        record.patient_city = " ".into();
        record.patient_phone = "  ".into();
        record.date_written = " ".into();

        let xml = render_message(&record, now()).expect("render");
        assert!(xml.contains(r#"<Prescription DateWritten=" ">"#));
        assert!(xml.contains(r#"<Patient ID=" ">"#));
        let address = section(section(&xml, "Patient"), "Address");
        assert!(address.contains("<City> </City>"));
        assert!(!address.contains("<Street>"));
        assert!(section(&xml, "Patient").contains("<Phone>  </Phone>"));
        assert!(!section(&xml, "Prescriber").contains("<Address>"));
    }

    #[test]
    fn escapes_free_text_values() {
        let mut record = humira_record();
        record.medication_name = "A & B <Co>".into();
        record.medication_directions = "Use \"as needed\" (don't exceed)".into();

        let xml = render_message(&record, now()).expect("render");
        assert!(xml.contains("<Name>A &amp; B &lt;Co&gt;</Name>"));
        assert!(xml.contains(
            "<Directions>Use &quot;as needed&quot; (don&apos;t exceed)</Directions>"
        ));
    }

    #[test]
    fn escapes_attribute_values() {
        let mut record = humira_record();
        record.patient_id = "P\"1&2".into();

        let xml = render_message(&record, now()).expect("render");
        assert!(xml.contains(r#"<Patient ID="P&quot;1&amp;2">"#));
    }

    #[test]
    fn rejects_control_characters_in_values() {
        let mut record = humira_record();
        record.medication_name = "A\u{1}B".into();
        match render_message(&record, now()) {
            Err(NcpdpError::ForbiddenCharacter { element, code }) => {
                assert_eq!(element, "Name");
                assert_eq!(code, 1);
            }
            other => panic!("expected ForbiddenCharacter, got {other:?}"),
        }

        let mut record = humira_record();
        record.patient_id = "P\u{0}".into();
        assert!(matches!(
            render_message(&record, now()),
            Err(NcpdpError::ForbiddenCharacter { element, .. }) if element == "Patient"
        ));
    }

    #[test]
    fn multi_line_directions_are_kept() {
        let mut record = humira_record();
        record.medication_directions = "Inject\tweekly\r\nwith food".into();
        let xml = render_message(&record, now()).expect("render");
        assert!(xml.contains("<Directions>Inject\tweekly\r\nwith food</Directions>"));
    }

    #[test]
    fn blank_record_renders_defaults_and_empty_required_elements() {
        let xml = render_message(&FlatPrescriptionRecord::default(), now()).expect("render");

        assert!(xml.contains(r#"<Prescription DateWritten="2024-01-15">"#));
        assert!(xml.contains(r#"<Patient ID="PAT001">"#));
        assert!(xml.contains(r#"<Prescriber ID="PRES001">"#));
        assert!(xml.contains("<FirstName></FirstName>"));
        assert!(xml.contains("<NPI></NPI>"));
        assert!(xml.contains("<Quantity>1</Quantity>"));
        assert!(!xml.contains("<DEA>"));
        assert!(!xml.contains("<Phone>"));
        assert!(!xml.contains("<Address>"));
        assert!(!xml.contains("<Refills>"));
        assert!(!xml.contains("<Insurance>"));
    }

    #[test]
    fn quantity_falls_back_for_non_numeric_text() {
        assert_eq!(resolve_quantity(""), 1);
        assert_eq!(resolve_quantity("two"), 1);
        assert_eq!(resolve_quantity("-3"), 1);
        assert_eq!(resolve_quantity(" 4 "), 4);
        assert_eq!(resolve_quantity("0"), 0);
    }

    #[test]
    fn date_written_falls_back_to_current_date() {
        let mut record = FlatPrescriptionRecord::default();
        assert_eq!(resolve_date_written(&record, now()), "2024-01-15");

        record.date_written = "2023-12-31".into();
        assert_eq!(resolve_date_written(&record, now()), "2023-12-31");
    }

    /// Text between the first `<name` and the matching `</name>`.
    fn section<'a>(xml: &'a str, name: &str) -> &'a str {
        let start = xml
            .find(&format!("<{name}"))
            .unwrap_or_else(|| panic!("no <{name}> in {xml}"));
        let end_tag = format!("</{name}>");
        let end = xml[start..]
            .find(&end_tag)
            .unwrap_or_else(|| panic!("no {end_tag} in {xml}"));
        &xml[start..start + end + end_tag.len()]
    }
}
