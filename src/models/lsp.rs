use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::pcep::{
    EndpointsObject, InitiateRequest, LspObject, LspaObject, PcepError, SrEroSubobject, SrpObject,
};

/// Controller-side intent for a segment routed LSP
///
/// Keyed by `name`; persisted to the store and pushed to the session owning `src`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SrLsp {
    pub name: String,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    #[serde(default)]
    pub delegate: bool,
    #[serde(default)]
    pub sync: bool,
    #[serde(default)]
    pub remove: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub ero: Vec<SrEroSubobject>,
    #[serde(default = "SrLsp::default_priority")]
    pub setup_priority: u8,
    #[serde(default = "SrLsp::default_priority")]
    pub hold_priority: u8,
    #[serde(default)]
    pub local_protection: bool,
    /// kbps, used for path selection only and never signalled to the router
    #[serde(default)]
    pub bandwidth: u32,
}

impl SrLsp {
    fn default_priority() -> u8 {
        7
    }

    /// Check everything that would otherwise fail while encoding a PCInitiate
    pub fn validate(&self) -> Result<(), PcepError> {
        if self.name.is_empty() {
            return Err(PcepError::InvalidField("LSP name is empty".to_string()));
        }
        if self.setup_priority > 7 || self.hold_priority > 7 {
            return Err(PcepError::InvalidField(format!(
                "priorities {}/{} must be 0-7",
                self.setup_priority, self.hold_priority
            )));
        }
        for subobject in &self.ero {
            subobject.validate()?;
        }
        Ok(())
    }

    /// PCInitiate body for creating (or updating) this LSP, without a
    /// BANDWIDTH object
    pub fn to_initiate(&self, srp_id: u32) -> InitiateRequest {
        InitiateRequest {
            srp: SrpObject::new(srp_id, false),
            lsp: LspObject {
                delegate: self.delegate,
                sync: self.sync,
                remove: self.remove,
                admin: self.admin,
                name: Some(self.name.clone()),
                ..Default::default()
            },
            endpoints: Some(EndpointsObject {
                source: self.src,
                destination: self.dst,
            }),
            ero: Some(self.ero.clone()),
            lspa: Some(LspaObject::new(
                self.setup_priority,
                self.hold_priority,
                self.local_protection,
            )),
            bandwidth: None,
        }
    }

    /// PCInitiate asking the router to tear down the LSP it knows as `plsp_id`
    pub fn to_removal(&self, srp_id: u32, plsp_id: u32) -> InitiateRequest {
        InitiateRequest {
            srp: SrpObject::new(srp_id, true),
            lsp: LspObject {
                plsp_id,
                remove: true,
                name: Some(self.name.clone()),
                ..Default::default()
            },
            endpoints: None,
            ero: None,
            lspa: None,
            bandwidth: None,
        }
    }
}

impl fmt::Display for SrLsp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<SrLsp {} {}->{} hops={}>",
            self.name,
            self.src,
            self.dst,
            self.ero.len()
        )
    }
}
