use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::result::Result as DefaultResult;
use std::sync::RwLock;

use serde_json::Value as JsnVal;

use super::AbstractConfidentiality;
use crate::error::{AppConfidentialityError, AppErrorCode};

const SOURCE_SIZE_LIMIT_NBYTES: u64 = 8196;

/// Secrets kept in a JSON file on local filesystem, only the entries which
/// have been read are cached.
pub struct UserSpaceConfidentiality {
    _src_fullpath: String,
    _cached: RwLock<HashMap<String, String>>,
}

fn io_error(e: std::io::Error) -> AppConfidentialityError {
    AppConfidentialityError {
        code: AppErrorCode::IOerror(e.kind()),
        detail: e.to_string(),
    }
}

impl UserSpaceConfidentiality {
    pub fn build(fullpath: String) -> Self {
        Self {
            _cached: RwLock::new(HashMap::new()),
            _src_fullpath: fullpath,
        }
    }

    fn load_source(&self) -> DefaultResult<JsnVal, AppConfidentialityError> {
        let mut file = File::open(self._src_fullpath.as_str()).map_err(io_error)?;
        let actual_f_sz = file.metadata().map_err(io_error)?.len();
        if actual_f_sz >= SOURCE_SIZE_LIMIT_NBYTES {
            return Err(AppConfidentialityError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: format!("source-file-size:{actual_f_sz}"),
            });
        }
        let mut rawbuf = Vec::new();
        file.read_to_end(&mut rawbuf).map_err(io_error)?;
        serde_json::from_slice::<JsnVal>(&rawbuf).map_err(|e| AppConfidentialityError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: e.to_string(),
        })
    }

    fn search_json_payload<'a>(
        toplvl: &'a JsnVal,
        id_: &str,
    ) -> DefaultResult<&'a JsnVal, AppConfidentialityError> {
        let mut curr_lvl = toplvl;
        for tok in id_.split('/') {
            let nxtlvl = match curr_lvl {
                JsnVal::Object(o) => o.get(tok),
                JsnVal::Array(a) => tok.parse::<usize>().ok().and_then(|idx| a.get(idx)),
                _others => None,
            };
            curr_lvl = nxtlvl.ok_or(AppConfidentialityError {
                code: AppErrorCode::NoConfidentialityCfg,
                detail: format!("id:{id_}, token:{tok}"),
            })?;
        }
        Ok(curr_lvl)
    }
} // end of impl UserSpaceConfidentiality

impl AbstractConfidentiality for UserSpaceConfidentiality {
    fn try_get_payload(&self, id_: &str) -> DefaultResult<String, AppConfidentialityError> {
        let lock_err = |detail: String| AppConfidentialityError {
            code: AppErrorCode::AcquireLockFailure,
            detail: detail + ", source: UserSpaceConfidentiality",
        };
        {
            let rguard = self._cached.read().map_err(|e| lock_err(e.to_string()))?;
            if let Some(v) = rguard.get(id_) {
                return Ok(v.clone());
            }
        } // read guard dropped before loading the source file
        let toplvl = self.load_source()?;
        let found = Self::search_json_payload(&toplvl, id_)?.to_string();
        let mut wguard = self._cached.write().map_err(|e| lock_err(e.to_string()))?;
        wguard.insert(id_.to_string(), found.clone());
        Ok(found)
    }
}
