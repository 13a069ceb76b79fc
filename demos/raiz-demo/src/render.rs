//! Plain-text rendering of system snapshots

use std::fmt::Write;

use raiz_core::TronState;
use raiz_runtime::{LiveTron, SystemSnapshot};

const BAR_WIDTH: usize = 20;

pub fn snapshot(s: &SystemSnapshot) -> String {
    let mut out = String::new();
    let stage = s.current_stage.map_or("-", |stage| stage.as_str());
    let _ = writeln!(
        out,
        "── t={}  {}  stage={}  trons={}",
        s.at,
        if s.running { "running" } else { "stopped" },
        stage,
        s.trons_active()
    );

    for node in &s.nodes {
        let st = &node.stats;
        let _ = writeln!(
            out,
            "   {:<10} {} active={:<3} created={} replicated={} deleted={} sent={} apoptosis={}",
            node.node_id.as_str(),
            if node.running { "●" } else { "○" },
            node.trons_active,
            st.trons_created,
            st.trons_replicated,
            st.trons_deleted,
            st.messages_sent,
            st.apoptosis_triggered,
        );
    }

    let channels: Vec<String> = s
        .gateway
        .channels
        .iter()
        .map(|(channel, status)| {
            let mark = if status.active { "" } else { "(off)" };
            format!("{channel}{mark}={}", status.messages)
        })
        .collect();
    let _ = writeln!(
        out,
        "   gateway    {}  total={}",
        channels.join(" "),
        s.gateway.total_messages
    );

    for tron in &s.trons {
        let _ = writeln!(out, "     {}", tron_line(tron));
    }
    out
}

fn tron_line(t: &LiveTron) -> String {
    let filled = ((t.progress / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let state = match t.state {
        TronState::Alive if t.delivered => "delivered",
        other => other.as_str(),
    };
    format!(
        "{} @{} {:<9} [{}{}] {:>3.0}% ttl={:>2}s valor={:>2} pot={:.1} freq={:.1} replicas={}",
        t.tron_id,
        t.node_id,
        state,
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        t.progress,
        t.ttl_remaining,
        t.valor,
        t.potencia,
        t.frequencia,
        t.replicas,
    )
}
