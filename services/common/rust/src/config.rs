use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::result::Result as DefaultResult;

use serde::de::{Error as DeserializeError, Expected};
use serde::Deserialize;

use crate::constant::{env_vars, logging as const_log};
use crate::error::{AppCfgError, AppErrorCode};
use crate::{AppLogAlias, WebApiPath};

#[derive(Deserialize)]
pub struct AppLogHandlerCfg {
    pub min_level: const_log::Level,
    pub destination: const_log::Destination,
    pub alias: AppLogAlias,
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct AppLoggerCfg {
    pub alias: AppLogAlias,
    pub handlers: Vec<String>,
    pub level: Option<const_log::Level>,
}

#[derive(Deserialize)]
pub struct AppLoggingCfg {
    pub handlers: Vec<AppLogHandlerCfg>,
    pub loggers: Vec<AppLoggerCfg>,
}

#[derive(Deserialize)]
pub struct WebApiRouteCfg {
    pub path: WebApiPath,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub handler: String,
}

impl Display for WebApiRouteCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path:{}, handler:{}", self.path, self.handler)
    }
}

#[derive(Deserialize)]
pub struct WebApiListenCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub api_version: String,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub cors: String,
    pub routes: Vec<WebApiRouteCfg>,
}

#[derive(Deserialize)]
#[serde(tag = "source")]
pub enum AppConfidentialCfg {
    UserSpace {
        #[serde(deserialize_with = "jsn_deny_empty_string")]
        sys_path: String,
    },
}

#[derive(Deserialize, Debug, Clone)]
pub enum AppDbServerType {
    MariaDB,
    PostgreSQL,
}

#[derive(Deserialize, Debug)]
pub struct AppInMemoryDbCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub max_items: u32,
}

#[derive(Deserialize, Debug)]
pub struct AppDbServerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub srv_type: AppDbServerType,
    pub max_conns: u32,
    pub acquire_timeout_secs: u16, // for acquiring connection from pool
    pub idle_timeout_secs: u16,
    pub confidentiality_path: String,
    pub db_name: String,
}

#[derive(Deserialize)]
#[serde(tag = "_type")]
pub enum AppDataStoreCfg {
    InMemory(AppInMemoryDbCfg),
    DbServer(AppDbServerCfg),
}

#[derive(Deserialize)]
pub struct ApiServerCfg {
    pub logging: AppLoggingCfg,
    pub listen: WebApiListenCfg,
    pub limit_req_body_in_bytes: usize,
    pub num_workers: u8,
    pub stack_sz_kb: u16,
    pub data_store: Vec<AppDataStoreCfg>,
    pub confidentiality: AppConfidentialCfg,
}

pub struct AppBasepathCfg {
    pub system: String,
    pub service: String,
}

pub struct AppConfig {
    pub basepath: AppBasepathCfg,
    pub api_server: ApiServerCfg,
}

pub struct AppCfgHardLimit {
    pub nitems_per_inmem_table: u32,
    pub num_db_conns: u32,
    pub seconds_db_idle: u16,
}

pub struct AppCfgInitArgs {
    pub env_var_map: HashMap<String, String, RandomState>,
    pub limit: AppCfgHardLimit,
}

fn cfg_error(code: AppErrorCode, detail: Option<String>) -> AppCfgError {
    AppCfgError { code, detail }
}

impl AppConfig {
    pub fn new(args: AppCfgInitArgs) -> DefaultResult<Self, AppCfgError> {
        let (mut env_var_map, limit) = (args.env_var_map, args.limit);
        let sys_basepath = env_var_map
            .remove(env_vars::SYS_BASEPATH)
            .map(|s| s + "/")
            .ok_or(cfg_error(AppErrorCode::MissingSysBasePath, None))?;
        let app_basepath = env_var_map
            .remove(env_vars::SERVICE_BASEPATH)
            .map(|s| s + "/")
            .ok_or(cfg_error(AppErrorCode::MissingAppBasePath, None))?;
        let cfg_path = env_var_map
            .remove(env_vars::CFG_FILEPATH)
            .ok_or(cfg_error(AppErrorCode::MissingConfigPath, None))?;
        let fullpath = app_basepath.clone() + &cfg_path;
        let api_server = Self::parse_from_file(fullpath, limit)?;
        Ok(Self {
            api_server,
            basepath: AppBasepathCfg {
                system: sys_basepath,
                service: app_basepath,
            },
        })
    } // end of fn new

    pub fn parse_from_file(
        filepath: String,
        limit: AppCfgHardLimit,
    ) -> DefaultResult<ApiServerCfg, AppCfgError> {
        let fileobj = File::open(filepath)
            .map_err(|e| cfg_error(AppErrorCode::IOerror(e.kind()), Some(e.to_string())))?;
        let reader = BufReader::new(fileobj);
        let jsnobj = serde_json::from_reader::<BufReader<File>, ApiServerCfg>(reader)
            .map_err(|e| cfg_error(AppErrorCode::InvalidJsonFormat, Some(e.to_string())))?;
        Self::_check_web_listener(&jsnobj.listen)?;
        Self::_check_logging(&jsnobj.logging)?;
        Self::_check_datastore(&jsnobj.data_store, limit)?;
        Ok(jsnobj)
    }

    fn _check_web_listener(obj: &WebApiListenCfg) -> DefaultResult<(), AppCfgError> {
        if obj.routes.is_empty() {
            return Err(cfg_error(AppErrorCode::NoRouteApiServerCfg, None));
        }
        let non_numeric = obj
            .api_version
            .split('.')
            .any(|tok| tok.parse::<u16>().is_err());
        if non_numeric {
            let msg = "version must be numeric".to_string();
            return Err(cfg_error(AppErrorCode::InvalidVersion, Some(msg)));
        }
        let badroute = obj
            .routes
            .iter()
            .find(|r| r.path.is_empty() || r.handler.is_empty());
        if let Some(r) = badroute {
            Err(cfg_error(AppErrorCode::InvalidRouteConfig, Some(r.to_string())))
        } else {
            Ok(())
        }
    } // end of fn _check_web_listener

    fn _check_logging(obj: &AppLoggingCfg) -> DefaultResult<(), AppCfgError> {
        if obj.handlers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLogHandlerCfg, None));
        }
        if obj.loggers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLoggerCfg, None));
        }
        if let Some(lgr) = obj.loggers.iter().find(|l| l.handlers.is_empty()) {
            let msg = format!("the logger does not have handler: {}", lgr.alias);
            return Err(cfg_error(AppErrorCode::NoHandlerInLoggerCfg, Some(msg)));
        }
        if obj.handlers.iter().any(|h| h.alias.is_empty()) {
            return Err(cfg_error(AppErrorCode::MissingAliasLogHdlerCfg, None));
        }
        if obj.loggers.iter().any(|l| l.alias.is_empty()) {
            return Err(cfg_error(AppErrorCode::MissingAliasLoggerCfg, None));
        }
        // file-type handler requires the field `path`
        let no_path = obj.handlers.iter().find(|h| {
            matches!(h.destination, const_log::Destination::LOCALFS) && h.path.is_none()
        });
        if let Some(h) = no_path {
            let msg = format!("file-type handler does not contain path: {}", h.alias);
            return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(msg)));
        }
        let hdlr_aliases: HashSet<&str> = obj.handlers.iter().map(|h| h.alias.as_str()).collect();
        let unknown_ref = obj.loggers.iter().find(|l| {
            l.handlers
                .iter()
                .any(|a| !hdlr_aliases.contains(a.as_str()))
        });
        if let Some(lgr) = unknown_ref {
            let msg = format!("the logger contains invalid handler alias: {}", lgr.alias);
            Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(msg)))
        } else {
            Ok(())
        }
    } // end of fn _check_logging

    fn _check_datastore(
        obj: &[AppDataStoreCfg],
        limit: AppCfgHardLimit,
    ) -> DefaultResult<(), AppCfgError> {
        if obj.is_empty() {
            return Err(cfg_error(AppErrorCode::NoDatabaseCfg, None));
        }
        for item in obj {
            let exceeded = match item {
                AppDataStoreCfg::InMemory(c) => (c.max_items > limit.nitems_per_inmem_table)
                    .then(|| format!("limit:{}", limit.nitems_per_inmem_table)),
                AppDataStoreCfg::DbServer(c) => {
                    if c.max_conns > limit.num_db_conns {
                        Some(format!("limit-conn:{}", limit.num_db_conns))
                    } else if c.idle_timeout_secs > limit.seconds_db_idle {
                        Some(format!("limit-idle-time:{}", limit.seconds_db_idle))
                    } else {
                        None
                    }
                }
            };
            if let Some(msg) = exceeded {
                return Err(cfg_error(AppErrorCode::ExceedingMaxLimit, Some(msg)));
            }
        }
        Ok(())
    } // end of fn _check_datastore
} // end of impl AppConfig

struct ExpectNonEmptyString {
    min_len: u32,
}

impl Expected for ExpectNonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = format!("minimum string length >= {}", self.min_len);
        formatter.write_str(msg.as_str())
    }
}

fn jsn_deny_empty_string<'de, D>(raw: D) -> DefaultResult<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(raw)?;
    if s.is_empty() {
        let exp = ExpectNonEmptyString { min_len: 1 };
        Err(DeserializeError::invalid_length(0, &exp))
    } else {
        Ok(s)
    }
}
