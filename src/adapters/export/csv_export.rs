//! CSV exports. Uses the `csv` crate for safe serialization.
//!
//! Semicolon-delimited (spreadsheet locale used by the site's editors).

use crate::domain::{Bill, UserMatch};

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

/// Bills as `CamaraId;Nome;Descricao`, one row per bill, with header.
pub fn bills_to_csv(bills: &[Bill]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["CamaraId", "Nome", "Descricao"])?;

    for bill in bills {
        // Ementas often span lines; keep one row per bill.
        let description = bill.description.replace('\n', " ").replace('\r', "");
        wtr.write_record([bill.camara_id.to_string().as_str(), &bill.name, &description])?;
    }

    wtr.flush()?;
    finish(wtr)
}

/// User search hits as `Id;Texto`.
pub fn user_matches_to_csv(matches: &[UserMatch]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["Id", "Texto"])?;
    for m in matches {
        wtr.write_record([m.id.to_string().as_str(), &m.text])?;
    }

    wtr.flush()?;
    finish(wtr)
}
