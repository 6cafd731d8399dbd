//! Map Câmara dos Deputados XML payloads to domain bills.
//!
//! Every `<proposicao>` element at any depth becomes one [`Bill`], in document
//! order. Only direct children are read:
//!
//! * `nomeProposicao` → `name`
//! * `Ementa` → `description`
//! * `idProposicao` → `camara_id` (leading integer of the text, `0` otherwise)
//!
//! Missing children leave the field empty / zero. When a child repeats, the
//! first occurrence wins.

use crate::domain::{Bill, DomainError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const BILL_TAG: &[u8] = b"proposicao";

#[derive(Debug, Clone, Copy)]
enum Field {
    Name,
    Description,
    CamaraId,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"nomeProposicao" => Some(Field::Name),
            b"Ementa" => Some(Field::Description),
            b"idProposicao" => Some(Field::CamaraId),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct PendingBill {
    values: [String; 3],
    seen: [bool; 3],
}

impl PendingBill {
    fn into_bill(self) -> Bill {
        let [name, description, camara_id] = self.values;
        Bill {
            id: None,
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            camara_id: leading_int(&camara_id),
        }
    }
}

/// One open element. `bill` is set for `<proposicao>`; `field` when this element
/// is a captured child of an open bill.
struct Frame {
    bill: Option<usize>,
    field: Option<(usize, Field)>,
}

/// Integer value of the leading digits of `text` (after trimming, optional sign).
/// Non-numeric text yields `0`; overflow saturates.
pub fn leading_int(text: &str) -> i64 {
    let t = text.trim();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        value = value.saturating_mul(10).saturating_add(d);
    }
    if negative { -value } else { value }
}

fn feed_err(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> DomainError {
    DomainError::Feed(format!(
        "invalid XML at byte {}: {}",
        reader.buffer_position(),
        e
    ))
}

fn open_element(e: &BytesStart<'_>, stack: &[Frame], pending: &mut Vec<PendingBill>) -> Frame {
    let local = e.local_name();
    let tag = local.as_ref();
    let parent_bill = stack.last().and_then(|f| f.bill);

    let field = parent_bill.and_then(|slot| {
        let field = Field::from_tag(tag)?;
        let bill = pending.get_mut(slot)?;
        if bill.seen[field.index()] {
            return None;
        }
        bill.seen[field.index()] = true;
        Some((slot, field))
    });

    let bill = if tag == BILL_TAG {
        pending.push(PendingBill::default());
        Some(pending.len() - 1)
    } else {
        None
    };

    Frame { bill, field }
}

fn append_text(stack: &[Frame], pending: &mut [PendingBill], text: &str) {
    if let Some(Frame {
        field: Some((slot, field)),
        ..
    }) = stack.last()
    {
        if let Some(bill) = pending.get_mut(*slot) {
            bill.values[field.index()].push_str(text);
        }
    }
}

/// Parse every `<proposicao>` in `content`. `None` or blank content yields an empty list.
///
/// # Errors
/// Returns `DomainError::Feed` when the payload is not well-formed XML.
pub fn bills_from_xml(content: Option<&str>) -> Result<Vec<Bill>, DomainError> {
    let content = match content {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Ok(Vec::new()),
    };

    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Frame> = Vec::new();
    let mut pending: Vec<PendingBill> = Vec::new();
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| feed_err(&reader, e))?;
        match event {
            Event::Start(e) => {
                if stack.is_empty() && saw_root {
                    return Err(feed_err(&reader, "multiple root elements"));
                }
                saw_root = true;
                let frame = open_element(&e, &stack, &mut pending);
                stack.push(frame);
            }
            Event::Empty(e) => {
                if stack.is_empty() && saw_root {
                    return Err(feed_err(&reader, "multiple root elements"));
                }
                saw_root = true;
                open_element(&e, &stack, &mut pending);
            }
            Event::End(_) => {
                if stack.pop().is_none() {
                    return Err(feed_err(&reader, "unbalanced closing tag"));
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| feed_err(&reader, e))?;
                if stack.is_empty() {
                    if !text.trim().is_empty() {
                        return Err(feed_err(&reader, "text outside of root element"));
                    }
                } else {
                    append_text(&stack, &mut pending, &text);
                }
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(c.as_ref()).map_err(|e| feed_err(&reader, e))?;
                append_text(&stack, &mut pending, text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(DomainError::Feed("document has no root element".into()));
    }
    if !stack.is_empty() {
        return Err(DomainError::Feed(format!(
            "document ended with {} unclosed element(s)",
            stack.len()
        )));
    }

    Ok(pending.into_iter().map(PendingBill::into_bill).collect())
}

/// Last bill of the payload, or `None` when it holds none.
///
/// # Errors
/// Returns `DomainError::Feed` when the payload is not well-formed XML.
pub fn bill_from_xml(content: Option<&str>) -> Result<Option<Bill>, DomainError> {
    Ok(bills_from_xml(content)?.pop())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAYLOAD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<proposicoes>
  <proposicao>
    <id>412130</id>
    <nome>PL 3962/2008</nome>
    <nomeProposicao>PL 3962/2008</nomeProposicao>
    <idProposicao>412130</idProposicao>
    <Ementa>Altera a Lei n&#186; 9.394, de 1996 &amp; dá outras providências.</Ementa>
  </proposicao>
  <proposicao>
    <nomeProposicao><![CDATA[PEC 37/2011]]></nomeProposicao>
    <idProposicao> 507965 </idProposicao>
    <Ementa/>
  </proposicao>
</proposicoes>"#;

    #[test]
    fn test_list_payload() {
        let bills = bills_from_xml(Some(LIST_PAYLOAD)).unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].name, "PL 3962/2008");
        assert_eq!(bills[0].camara_id, 412130);
        assert_eq!(
            bills[0].description,
            "Altera a Lei nº 9.394, de 1996 & dá outras providências."
        );
        assert_eq!(bills[1].name, "PEC 37/2011");
        assert_eq!(bills[1].camara_id, 507965);
        assert_eq!(bills[1].description, "");
        assert!(bills.iter().all(|b| b.id.is_none()));
    }

    #[test]
    fn test_root_proposicao_payload() {
        let xml = r#"<proposicao tipo="PL " numero="3962" ano="2008">
            <nomeProposicao>PL 3962/2008</nomeProposicao>
            <idProposicao>412130</idProposicao>
            <Ementa>Ementa única</Ementa>
        </proposicao>"#;
        let bill = bill_from_xml(Some(xml)).unwrap().unwrap();
        assert_eq!(bill.name, "PL 3962/2008");
        assert_eq!(bill.camara_id, 412130);
        assert_eq!(bill.description, "Ementa única");
    }

    #[test]
    fn test_nested_bills_in_document_order() {
        let xml = r#"<root>
            <proposicao>
                <nomeProposicao>outer</nomeProposicao>
                <apensadas>
                    <proposicao><nomeProposicao>inner</nomeProposicao><idProposicao>2</idProposicao></proposicao>
                </apensadas>
                <idProposicao>1</idProposicao>
            </proposicao>
        </root>"#;
        let bills = bills_from_xml(Some(xml)).unwrap();
        let names: Vec<_> = bills.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(bills[0].camara_id, 1);
        assert_eq!(bills[1].camara_id, 2);
    }

    #[test]
    fn test_only_direct_children_and_first_wins() {
        let xml = r#"<proposicao>
            <autor><nomeProposicao>not mine</nomeProposicao></autor>
            <nomeProposicao>first</nomeProposicao>
            <nomeProposicao>second</nomeProposicao>
        </proposicao>"#;
        let bills = bills_from_xml(Some(xml)).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].name, "first");
        assert_eq!(bills[0].camara_id, 0);
    }

    #[test]
    fn test_empty_content() {
        assert!(bills_from_xml(None).unwrap().is_empty());
        assert!(bills_from_xml(Some("   ")).unwrap().is_empty());
        assert_eq!(bill_from_xml(None).unwrap(), None);
        assert_eq!(bill_from_xml(Some("<proposicoes/>")).unwrap(), None);
    }

    #[test]
    fn test_get_returns_last() {
        let bill = bill_from_xml(Some(LIST_PAYLOAD)).unwrap().unwrap();
        assert_eq!(bill.camara_id, 507965);
    }

    #[test]
    fn test_malformed_xml() {
        for bad in [
            "<proposicoes><proposicao></proposicoes>",
            "<proposicoes><proposicao>",
            "not xml at all",
            "<a/><b/>",
        ] {
            assert!(
                matches!(bills_from_xml(Some(bad)), Err(DomainError::Feed(_))),
                "expected feed error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("123"), 123);
        assert_eq!(leading_int("  42abc"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("99999999999999999999999"), i64::MAX);
    }
}
