//! Enterprise Guide automation through COM late binding.
//!
//! COM objects created in a single-threaded apartment must be called from the
//! thread that created them, so every instance gets a dedicated worker thread
//! and the async handles talk to it over a channel.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;

use async_trait::async_trait;
use tokio::sync::oneshot;

use windows::core::{Interface, IUnknown, BSTR, GUID, PCWSTR, VARIANT};
use windows::Win32::Foundation::{CO_E_CLASSSTRING, REGDB_E_CLASSNOTREG};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoUninitialize, IDispatch, CLSCTX_ALL,
    COINIT_APARTMENTTHREADED, DISPATCH_METHOD, DISPPARAMS, EXCEPINFO,
};

use egrun_core::api::{HostApplication, HostError, HostPlugin, HostProject};

const PROG_ID_PREFIX: &str = "SASEGObjectModel.Application.";
const LOCALE_USER_DEFAULT: u32 = 0x0400;
const PROFILE_MISSING_MARKER: &str = "profile name does not exist";

type Reply = oneshot::Sender<Result<(), HostError>>;

enum Command {
    SetActiveProfile(String, Reply),
    Open(PathBuf, Reply),
    Run(Reply),
    SaveAs(PathBuf, Reply),
    Close(Reply),
}

#[derive(Debug, Default)]
pub struct EnterpriseGuideHost;

impl EnterpriseGuideHost {
    pub fn prog_id(version: &str) -> String {
        format!("{PROG_ID_PREFIX}{version}")
    }
}

#[async_trait]
impl HostPlugin for EnterpriseGuideHost {
    fn name(&self) -> &str {
        "enterprise-guide"
    }

    async fn launch(&self, version: &str) -> Result<Box<dyn HostApplication>, HostError> {
        let (cmd_tx, cmd_rx) = std_mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), HostError>>();
        let version_owned = version.to_string();

        thread::Builder::new()
            .name(format!("egrun-com-{version}"))
            .spawn(move || worker_main(version_owned, ready_tx, cmd_rx))
            .map_err(|e| HostError::Unavailable {
                reason: format!("failed to start COM worker thread: {e}"),
            })?;

        ready_rx.await.map_err(|_| worker_gone("launch"))??;
        tracing::debug!(target: "egrun.host", version, "automation object created");
        Ok(Box::new(ComApplication { tx: cmd_tx }))
    }
}

struct ComApplication {
    tx: std_mpsc::Sender<Command>,
}

#[async_trait]
impl HostApplication for ComApplication {
    async fn set_active_profile(&mut self, profile: &str) -> Result<(), HostError> {
        let profile = profile.to_string();
        request(&self.tx, "SetActiveProfile", |r| Command::SetActiveProfile(profile, r)).await
    }

    async fn open_project(&mut self, path: &Path) -> Result<Box<dyn HostProject>, HostError> {
        let path = path.to_path_buf();
        request(&self.tx, "Open", |r| Command::Open(path, r)).await?;
        Ok(Box::new(ComProject {
            tx: self.tx.clone(),
        }))
    }
}

struct ComProject {
    tx: std_mpsc::Sender<Command>,
}

#[async_trait]
impl HostProject for ComProject {
    async fn run(&mut self) -> Result<(), HostError> {
        request(&self.tx, "Run", Command::Run).await
    }

    async fn save_as(&mut self, target: &Path) -> Result<(), HostError> {
        let target = target.to_path_buf();
        request(&self.tx, "SaveAs", |r| Command::SaveAs(target, r)).await
    }

    async fn close(&mut self) -> Result<(), HostError> {
        request(&self.tx, "Close", Command::Close).await
    }
}

async fn request(
    tx: &std_mpsc::Sender<Command>,
    op: &'static str,
    build: impl FnOnce(Reply) -> Command,
) -> Result<(), HostError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(build(reply_tx)).map_err(|_| worker_gone(op))?;
    reply_rx.await.map_err(|_| worker_gone(op))?
}

fn worker_gone(op: &'static str) -> HostError {
    HostError::call(op, "COM worker thread is no longer running")
}

fn worker_main(
    version: String,
    ready: oneshot::Sender<Result<(), HostError>>,
    commands: std_mpsc::Receiver<Command>,
) {
    // SAFETY: paired with CoUninitialize below on the same thread.
    if let Err(e) = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok() {
        let _ = ready.send(Err(HostError::Unavailable {
            reason: format!("CoInitializeEx failed: {e}"),
        }));
        return;
    }

    let app = match create_application(&version) {
        Ok(app) => app,
        Err(e) => {
            let _ = ready.send(Err(e));
            unsafe { CoUninitialize() };
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        drop(app);
        unsafe { CoUninitialize() };
        return;
    }

    let mut project: Option<IDispatch> = None;
    while let Ok(cmd) = commands.recv() {
        match cmd {
            Command::SetActiveProfile(profile, reply) => {
                let result = invoke(&app, "SetActiveProfile", vec![bstr_arg(&profile)])
                    .map(drop)
                    .map_err(|e| profile_error(&profile, e));
                let _ = reply.send(result);
            }
            Command::Open(path, reply) => {
                let result = invoke(
                    &app,
                    "Open",
                    vec![bstr_arg(&path.display().to_string()), bstr_arg("")],
                )
                .and_then(|v| {
                    IUnknown::try_from(&v)
                        .and_then(|unk| unk.cast::<IDispatch>())
                        .map_err(|e| HostError::call("Open", format!("no project object: {e}")))
                })
                .map(|p| project = Some(p));
                let _ = reply.send(result);
            }
            Command::Run(reply) => {
                let _ = reply.send(on_project(project.as_ref(), "Run", vec![]));
            }
            Command::SaveAs(target, reply) => {
                let arg = bstr_arg(&target.display().to_string());
                let _ = reply.send(on_project(project.as_ref(), "SaveAs", vec![arg]));
            }
            Command::Close(reply) => {
                let result = on_project(project.as_ref(), "Close", vec![]);
                project = None;
                let _ = reply.send(result);
            }
        }
    }

    drop(project);
    drop(app);
    unsafe { CoUninitialize() };
    tracing::debug!(target: "egrun.host", version = %version, "COM worker stopped");
}

fn create_application(version: &str) -> Result<IDispatch, HostError> {
    let prog_id = wide(&EnterpriseGuideHost::prog_id(version));
    // SAFETY: `prog_id` is NUL-terminated and outlives the call.
    let clsid = unsafe { CLSIDFromProgID(PCWSTR(prog_id.as_ptr())) }.map_err(|e| {
        if e.code() == CO_E_CLASSSTRING || e.code() == REGDB_E_CLASSNOTREG {
            HostError::VersionNotFound {
                version: version.to_string(),
            }
        } else {
            HostError::Unavailable {
                reason: format!("CLSIDFromProgID failed: {e}"),
            }
        }
    })?;

    unsafe { CoCreateInstance::<_, IDispatch>(&clsid, None, CLSCTX_ALL) }.map_err(|e| {
        HostError::Unavailable {
            reason: format!("CoCreateInstance failed: {e}"),
        }
    })
}

fn on_project(
    project: Option<&IDispatch>,
    op: &'static str,
    args: Vec<VARIANT>,
) -> Result<(), HostError> {
    let project = project.ok_or_else(|| HostError::call(op, "no project is open"))?;
    invoke(project, op, args).map(drop)
}

fn profile_error(profile: &str, e: HostError) -> HostError {
    match &e {
        HostError::Call { message, .. }
            if message.to_ascii_lowercase().contains(PROFILE_MISSING_MARKER) =>
        {
            HostError::ProfileNotFound {
                profile: profile.to_string(),
            }
        }
        _ => e,
    }
}

/// Calls a method by name. `args` are given in call order.
fn invoke(target: &IDispatch, name: &'static str, args: Vec<VARIANT>) -> Result<VARIANT, HostError> {
    let wide_name = wide(name);
    let names = [PCWSTR(wide_name.as_ptr())];
    let mut dispid = 0i32;
    // SAFETY: one name in, one dispid out; both buffers live across the call.
    unsafe {
        target.GetIDsOfNames(
            &GUID::zeroed(),
            names.as_ptr(),
            1,
            LOCALE_USER_DEFAULT,
            &mut dispid,
        )
    }
    .map_err(|e| HostError::call(name, format!("method lookup failed: {e}")))?;

    // IDispatch expects positional arguments last-to-first.
    let mut rgvarg: Vec<VARIANT> = args.into_iter().rev().collect();
    let params = DISPPARAMS {
        rgvarg: rgvarg.as_mut_ptr(),
        rgdispidNamedArgs: std::ptr::null_mut(),
        cArgs: rgvarg.len() as u32,
        cNamedArgs: 0,
    };
    let mut result = VARIANT::default();
    let mut excep = EXCEPINFO::default();

    // SAFETY: `params` points into `rgvarg`, which outlives the call.
    unsafe {
        target.Invoke(
            dispid,
            &GUID::zeroed(),
            LOCALE_USER_DEFAULT,
            DISPATCH_METHOD,
            &params,
            Some(&mut result as *mut VARIANT),
            Some(&mut excep as *mut EXCEPINFO),
            None,
        )
    }
    .map_err(|e| {
        let description = excep.bstrDescription.to_string();
        let message = if description.trim().is_empty() {
            e.to_string()
        } else {
            description.trim().to_string()
        };
        HostError::call(name, message)
    })?;

    Ok(result)
}

fn bstr_arg(s: &str) -> VARIANT {
    VARIANT::from(BSTR::from(s))
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
