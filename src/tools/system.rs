use crate::error::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use sysinfo::{Disks, System};

const GIB: u64 = 1024 * 1024 * 1024;
const TOP_PROCESSES: usize = 20;

#[derive(Debug, Serialize)]
struct SystemInfo {
    #[serde(rename = "Operating System")]
    os: String,
    #[serde(rename = "OS Version")]
    os_version: String,
    #[serde(rename = "Kernel Version")]
    kernel_version: String,
    #[serde(rename = "Machine")]
    machine: String,
    #[serde(rename = "Processor")]
    processor: String,
    #[serde(rename = "Host Name")]
    host_name: String,
    #[serde(rename = "Current Directory")]
    current_dir: String,
    #[serde(rename = "Home Directory")]
    home_dir: String,
    #[serde(rename = "CPU Count")]
    cpu_count: usize,
    #[serde(rename = "Memory Total")]
    memory_total: String,
    #[serde(rename = "Memory Available")]
    memory_available: String,
    #[serde(rename = "Disk Usage")]
    disk_free: String,
}

pub fn system_info() -> Result<String> {
    let sys = System::new_all();
    let unknown = || "unknown".to_string();

    let disks = Disks::new_with_refreshed_list();
    let root_disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());
    let disk_free = root_disk
        .map(|d| format!("{} GB free", d.available_space() / GIB))
        .unwrap_or_else(unknown);

    let info = SystemInfo {
        os: System::name().unwrap_or_else(unknown),
        os_version: System::os_version().unwrap_or_else(unknown),
        kernel_version: System::kernel_version().unwrap_or_else(unknown),
        machine: std::env::consts::ARCH.to_string(),
        processor: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(unknown),
        host_name: System::host_name().unwrap_or_else(unknown),
        current_dir: std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| unknown()),
        home_dir: dirs::home_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(unknown),
        cpu_count: sys.cpus().len(),
        memory_total: format!("{} GB", sys.total_memory() / GIB),
        memory_available: format!("{} GB", sys.available_memory() / GIB),
        disk_free,
    };

    Ok(serde_json::to_string_pretty(&info)?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

pub fn running_processes() -> Result<String> {
    let mut sys = System::new_all();
    // CPU usage is a delta between two refreshes
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_all();

    let total_memory = sys.total_memory().max(1) as f64;
    let rows = sys
        .processes()
        .iter()
        .map(|(pid, process)| ProcessRow {
            pid: pid.as_u32(),
            name: process.name().to_string_lossy().into_owned(),
            cpu_percent: process.cpu_usage(),
            memory_percent: (process.memory() as f64 / total_memory * 100.0) as f32,
        })
        .collect();

    Ok(format_process_table(rows))
}

/// Keeps busy processes (cpu > 0 or memory > 1%), highest CPU first.
pub fn format_process_table(rows: Vec<ProcessRow>) -> String {
    let mut rows: Vec<ProcessRow> = rows
        .into_iter()
        .filter(|p| p.cpu_percent > 0.0 || p.memory_percent > 1.0)
        .collect();
    rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));

    let mut out = String::from("Top processes by CPU usage:\n");
    let _ = writeln!(out, "{:<8} {:<25} {:<8} {:<8}", "PID", "Name", "CPU%", "Memory%");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for p in rows.iter().take(TOP_PROCESSES) {
        let name: String = p.name.chars().take(24).collect();
        let _ = writeln!(
            out,
            "{:<8} {:<25} {:<8.1} {:<8.1}",
            p.pid, name, p.cpu_percent, p.memory_percent
        );
    }
    out
}
