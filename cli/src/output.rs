use colored::*;

use lib_sentinel::api::{OrganizationSettings, SecurityEventRecord, TeamMember};
use lib_sentinel::feed::{Notification, NotificationKind, SecurityEvent, TrafficData};
use lib_sentinel::views::{
    format_timestamp, role_label, DashboardView, RenderState, SecurityEventRow, SeverityBucket,
    StatusIndicator,
};

pub fn toast(notification: &Notification) {
    let ts = notification.timestamp.format("%H:%M:%S").to_string().truecolor(128, 128, 128);
    let message = match notification.kind {
        NotificationKind::Error => notification.message.red().bold(),
        NotificationKind::Warning => notification.message.yellow(),
        NotificationKind::Success => notification.message.green(),
        NotificationKind::Info => notification.message.cyan(),
    };
    println!("{} {} {}", ts, "[alert]".truecolor(128, 128, 128), message);
}

pub fn security_event(event: &SecurityEvent) {
    let row = SecurityEventRow::from_event(event);
    let label = match row.kind {
        NotificationKind::Error => row.label.red().bold(),
        NotificationKind::Warning => row.label.yellow(),
        _ => row.label.cyan(),
    };
    println!("{} {} ({})", label, row.description, row.route.truecolor(128, 128, 128));
}

pub fn traffic(data: &TrafficData) {
    println!(
        "{} {} -> {} {} {}B",
        "[traffic]".truecolor(128, 128, 128),
        data.source_ip,
        data.destination_ip,
        data.protocol,
        data.size
    );
}

pub fn dashboard(view: &DashboardView) {
    match view.state() {
        RenderState::Loading => println!("Loading..."),
        RenderState::Failed(message) => println!("{}", message.red()),
        RenderState::Ready(data) => {
            let panel = data.health_panel();
            println!("{}", "System Health".bold());
            match panel.indicator {
                StatusIndicator::Success => println!("  {}", panel.status.green()),
                StatusIndicator::Error => println!("  {}", panel.status.red().bold()),
            }
            println!("  {}", panel.cpu);
            println!("  {}", panel.memory);
            println!("{}", "Recent Anomalies".bold());
            for line in data.anomaly_lines() {
                println!("  {}", line.yellow());
            }
        }
    }
}

pub fn events_table(events: &[&SecurityEventRecord]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    for event in events {
        let severity = match event.severity.to_ascii_lowercase().as_str() {
            "high" => event.severity.red().bold(),
            "medium" => event.severity.yellow(),
            _ => event.severity.green(),
        };
        println!(
            "{}  {:<8} {:<16} {}",
            format_timestamp(&event.created_at),
            severity,
            event.event_type,
            event.description
        );
    }
}

pub fn severity_chart(buckets: &[SeverityBucket]) {
    for bucket in buckets {
        println!(
            "{}  {} {} {}",
            bucket.date,
            format!("low:{}", bucket.low).green(),
            format!("medium:{}", bucket.medium).yellow(),
            format!("high:{}", bucket.high).red()
        );
    }
}

pub fn team(members: &[&TeamMember]) {
    for member in members {
        let status = if member.is_active {
            "active".green()
        } else {
            "inactive".truecolor(128, 128, 128)
        };
        println!(
            "{:<8} {:<24} {:<32} {:<14} {}",
            member.id,
            member.full_name,
            member.email,
            role_label(member),
            status
        );
    }
}

pub fn settings(settings: &OrganizationSettings) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
