use std::mem;

use chrono::{DateTime, Utc};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::pcep::{
    Ipv4LspIdentifiers, LspObject, LspOper, LspaObject, MetricObject, Object, ObjectHeader,
    SrEroSubobject,
};

/// Last known state of an LSP as reported by the router (PCRpt)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LspReport {
    pub name: String,
    pub plsp_id: u32,
    pub oper: LspOper,
    pub delegate: bool,
    pub sync: bool,
    pub remove: bool,
    pub admin: bool,
    pub srp_id: u32,
    pub ipv4_identifiers: Option<Ipv4LspIdentifiers>,
    pub ero: Vec<SrEroSubobject>,
    pub rro: Vec<SrEroSubobject>,
    pub bandwidth: Option<f32>,
    pub metrics: Vec<MetricObject>,
    pub lspa: Option<LspaObject>,
    pub received_at: Option<DateTime<Utc>>,
}

impl LspReport {
    fn apply_lsp(&mut self, lsp: LspObject) {
        self.plsp_id = lsp.plsp_id;
        self.oper = lsp.oper;
        self.delegate = lsp.delegate;
        self.sync = lsp.sync;
        self.remove = lsp.remove;
        self.admin = lsp.admin;
        self.name = lsp.name.unwrap_or_default();
        self.ipv4_identifiers = lsp.ipv4_identifiers;
    }

    /// Split a PCRpt body into one snapshot per state report
    ///
    /// A report is `[SRP] LSP <path>`, so a new report starts at an SRP or
    /// LSP object once the current one already has its LSP.
    pub(super) fn from_objects(objects: Vec<(ObjectHeader, Object)>) -> Vec<LspReport> {
        let mut reports = Vec::new();
        let mut current = LspReport::default();
        let mut has_lsp = false;
        for (header, object) in objects {
            match object {
                Object::Srp(srp) => {
                    if has_lsp {
                        reports.push(mem::take(&mut current));
                        has_lsp = false;
                    }
                    current.srp_id = srp.srp_id;
                }
                Object::Lsp(lsp) => {
                    if has_lsp {
                        reports.push(mem::take(&mut current));
                    }
                    current.apply_lsp(lsp);
                    has_lsp = true;
                }
                Object::Ero(ero) => current.ero = ero,
                Object::Rro(rro) => current.rro = rro,
                Object::Bandwidth(bandwidth) => current.bandwidth = Some(bandwidth.bandwidth),
                Object::Metric(metric) => current.metrics.push(metric),
                Object::Lspa(lspa) => current.lspa = Some(lspa),
                _ => trace!(
                    "Ignoring object class {:?} type {} in PCRpt",
                    header.class,
                    header.object_type
                ),
            }
        }
        if has_lsp {
            reports.push(current);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use bytes::BytesMut;

    use super::*;
    use crate::pcep::{decode_objects, encode_ero, BandwidthObject, SrpObject};

    #[test]
    fn test_single_report() {
        let mut body = BytesMut::new();
        SrpObject::new(3, false).encode(&mut body);
        LspObject {
            plsp_id: 9,
            oper: LspOper::Up,
            delegate: true,
            name: Some("LSP-A".to_string()),
            ..Default::default()
        }
        .encode(&mut body)
        .unwrap();
        encode_ero(
            &[SrEroSubobject::ipv4_node(16002, Ipv4Addr::new(2, 2, 2, 2))],
            &mut body,
        )
        .unwrap();
        BandwidthObject { bandwidth: 100.0 }.encode(&mut body);

        let reports = LspReport::from_objects(decode_objects(&body).unwrap());
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.name, "LSP-A");
        assert_eq!(report.plsp_id, 9);
        assert_eq!(report.srp_id, 3);
        assert_eq!(report.oper, LspOper::Up);
        assert!(report.delegate);
        assert_eq!(report.ero.len(), 1);
        assert_eq!(report.bandwidth, Some(100.0));
    }

    #[test]
    fn test_multiple_reports() {
        let mut body = BytesMut::new();
        for plsp_id in 1..=3 {
            LspObject {
                plsp_id,
                name: Some(format!("LSP-{}", plsp_id)),
                ..Default::default()
            }
            .encode(&mut body)
            .unwrap();
        }
        // End of synchronization marker
        SrpObject::new(0, false).encode(&mut body);
        LspObject::default().encode(&mut body).unwrap();

        let reports = LspReport::from_objects(decode_objects(&body).unwrap());
        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LSP-1", "LSP-2", "LSP-3", ""]);
        assert_eq!(reports[3].plsp_id, 0);
    }

    #[test]
    fn test_no_lsp_object() {
        let mut body = BytesMut::new();
        SrpObject::new(3, false).encode(&mut body);
        assert!(LspReport::from_objects(decode_objects(&body).unwrap()).is_empty());
    }
}
