// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `pdb_download`/`pdb_upload`: move a [`PdbDatabase`] between the device
//! (over an open DLP session) and memory (§4.6).

use crate::dlp::commands::{self, DbHandle};
use crate::dlp::DlpSession;
use crate::error::Result;
use crate::pdb::{Payloads, PdbDatabase, PdbRecord, PdbResource, RecordStateWire};

/// Build a full in-memory image of the database behind `handle` by
/// enumerating its records (or resources) one DLP call at a time.
///
/// `db_flags`/`r#type`/`creator`/`version`/times are supplied by the
/// caller from the `ReadDBList` entry that produced `handle`'s name,
/// since `OpenDB` itself doesn't return the header fields.
#[allow(clippy::too_many_arguments)]
pub fn pdb_download(
    session: &mut DlpSession,
    handle: DbHandle,
    name: &str,
    db_flags: u16,
    r#type: [u8; 4],
    creator: [u8; 4],
    version: u16,
    unique_id_seed: u32,
    is_resource_db: bool,
) -> Result<PdbDatabase> {
    let info = commands::read_open_db_info(session, handle)?;
    let appinfo = commands::read_app_block(session, handle)?;
    let sortinfo = commands::read_sort_block(session, handle)?;

    let payloads = if is_resource_db {
        let mut resources = Vec::with_capacity(info.num_records as usize);
        for index in 0..info.num_records {
            let r = commands::read_resource_by_index(session, handle, index)?;
            resources.push(PdbResource { r#type: r.r#type, id: r.id, data: r.data });
        }
        Payloads::Resources(resources)
    } else {
        let ids = commands::read_record_id_list(session, handle, 0, u16::MAX)?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let r = commands::read_record_by_id(session, handle, id)?;
            records.push(PdbRecord { id: r.id, state: RecordStateWire::from_byte(r.attrs), data: r.data });
        }
        Payloads::Records(records)
    };

    Ok(PdbDatabase {
        name: name.to_string(),
        attributes: db_flags,
        version,
        ctime: 0,
        mtime: 0,
        baktime: 0,
        modnum: 0,
        r#type,
        creator,
        unique_id_seed,
        appinfo,
        sortinfo,
        payloads,
    })
}

/// Upload `db` into a freshly created database on the device: `CreateDB`,
/// then AppInfo/sort blocks, then every record or resource in order.
///
/// For record databases, the device may assign a new uniqueID to each
/// record; `db`'s in-memory copy is updated in place so a subsequent
/// local persist reflects the device's authoritative id (§4.6).
pub fn pdb_upload(session: &mut DlpSession, card: u8, db: &mut PdbDatabase) -> Result<DbHandle> {
    let handle = commands::create_db(session, card, &db.name, db.creator, db.r#type, db.attributes, db.version)?;

    if let Some(appinfo) = &db.appinfo {
        commands::write_app_block(session, handle, appinfo)?;
    }
    if let Some(sortinfo) = &db.sortinfo {
        commands::write_sort_block(session, handle, sortinfo)?;
    }

    match &mut db.payloads {
        Payloads::Records(records) => {
            for record in records.iter_mut() {
                let new_id = commands::write_record(session, handle, record.id, record.state.to_byte(), record.state.0.category().unwrap_or(0), &record.data)?;
                record.id = new_id;
            }
        }
        Payloads::Resources(resources) => {
            for resource in resources.iter() {
                commands::write_resource(session, handle, resource.r#type, resource.id, &resource.data)?;
            }
        }
    }

    Ok(handle)
}

#[cfg(test)]
mod tests {
    // `pdb_download`/`pdb_upload` are exercised end-to-end by the
    // `sync` module's tests against a scripted DLP session, since a
    // meaningful unit test here would just re-implement a fake device.
}
