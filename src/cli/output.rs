//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use anyhow::Result;
use incident_themes::{ClusteredTicketReport, Partition, TfidfVectorizer, ThemeReport};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Print labeled clusters of plain documents.
pub fn print_theme_report(report: &ThemeReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!("Clustering Results");
    println!("{}", "=".repeat(60));
    println!(
        "Documents: {}  |  Clusters: {} (requested {})  |  Labeler: {}",
        report.total_documents,
        report.clusters.len(),
        report.requested_clusters,
        report.labeler
    );
    if let Some(anomaly) = &report.anomaly {
        println!("Warning: {}", anomaly);
    }
    println!();

    for cluster in &report.clusters {
        println!(
            "Cluster {} ({} docs): {}",
            cluster.cluster_id,
            cluster.members.len(),
            cluster.description
        );
        for member in &cluster.members {
            println!("  - {}", truncate(member, 80));
        }
        println!();
    }
    Ok(())
}

/// Print labeled clusters of tickets.
pub fn print_ticket_report(report: &ClusteredTicketReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!("Clustering Results");
    println!("{}", "=".repeat(60));
    if let Some(anomaly) = &report.anomaly {
        println!("Warning: {}", anomaly);
    }

    for (i, cluster) in report.clusters.iter().enumerate() {
        println!();
        println!("Cluster {} ({} tickets): {}", i, cluster.tickets.len(), cluster.description);
        for ticket in &cluster.tickets {
            println!(
                "  {:<12} {:<10} {}",
                ticket.number,
                ticket.priority,
                truncate(&ticket.short_description, 60)
            );
        }
    }
    Ok(())
}

/// Print index groups from a bare partition.
pub fn print_partition(partition: &Partition, texts: &[String], json: bool) -> Result<()> {
    if json {
        return print_json(partition);
    }

    println!(
        "Clusters: {}  |  Inertia: {:.4}  |  Iterations: {}",
        partition.num_clusters(),
        partition.inertia,
        partition.iterations
    );
    for (cluster, members) in &partition.clusters {
        println!();
        println!("Cluster {} ({} docs)", cluster, members.len());
        for &index in members {
            let text = texts.get(index).map(String::as_str).unwrap_or_default();
            println!("  [{}] {}", index, truncate(text, 80));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct VocabularyEntry<'a> {
    column: usize,
    term: &'a str,
    idf: Option<f64>,
}

/// Print the fitted vocabulary with IDF weights.
pub fn print_vocabulary(vectorizer: &TfidfVectorizer, json: bool) -> Result<()> {
    let entries: Vec<VocabularyEntry<'_>> = vectorizer
        .terms()
        .into_iter()
        .enumerate()
        .map(|(column, (term, idf))| VocabularyEntry { column, term, idf })
        .collect();

    if json {
        return print_json(&entries);
    }

    println!("{:<8} {:<30} IDF", "COLUMN", "TERM");
    println!("{}", "-".repeat(50));
    for entry in &entries {
        let idf = entry
            .idf
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<8} {:<30} {}", entry.column, truncate(entry.term, 30), idf);
    }
    println!("\nTotal: {} terms", entries.len());
    Ok(())
}
