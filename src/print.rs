//! Console tables for projections and ratings.

use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Cell, Col, Row, Table};

use crate::aggregate::{TeamAverages, TeamSummary};
use crate::apportion::BoxScoreLine;
use crate::data::Role;
use crate::metric::Metric;
use crate::model::Projection;
use crate::rating::PlayerRatingProfile;

fn optional(value: Option<f64>, precision: usize) -> Cell {
    match value {
        Some(value) => format!("{value:.precision$}").into(),
        None => "-".into(),
    }
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

type Extractor = fn(&TeamAverages) -> String;

const AVERAGE_ROWS: [(&str, Extractor); 16] = [
    ("Points", |averages| format!("{:.1}", averages.totals.points)),
    ("3PA", |averages| format!("{:.1}", averages.totals.three_attempts)),
    ("3PM", |averages| format!("{:.1}", averages.totals.three_made)),
    ("3P%", |averages| pct(averages.three_pct)),
    ("2PA", |averages| format!("{:.1}", averages.totals.two_attempts)),
    ("2PM", |averages| format!("{:.1}", averages.totals.two_made)),
    ("2P%", |averages| pct(averages.two_pct)),
    ("FTA", |averages| format!("{:.1}", averages.totals.fta)),
    ("FTM", |averages| format!("{:.1}", averages.totals.ftm)),
    ("FT%", |averages| pct(averages.ft_pct)),
    ("eFG%", |averages| pct(averages.effective_fg_pct)),
    ("FT rate", |averages| format!("{:.3}", averages.ft_rate)),
    ("OREB", |averages| format!("{:.1}", averages.totals.off_rebounds)),
    ("DREB", |averages| format!("{:.1}", averages.totals.def_rebounds)),
    ("OREB%", |averages| pct(averages.off_rebound_pct)),
    ("Turnovers", |averages| format!("{:.1}", averages.totals.turnovers)),
];

/// One row per metric, one column per team.
pub fn tabulate_metrics(projection: &Projection) -> Table {
    let summary = &projection.summary;
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Metric".into(),
                projection.home.clone().into(),
                projection.away.clone().into(),
            ],
        ));

    let (home, away) = (&summary.home, &summary.away);
    for (label, extract) in AVERAGE_ROWS {
        let cell = |team: &TeamSummary| -> Cell {
            match &team.averages {
                Some(averages) => extract(averages).into(),
                None => "-".into(),
            }
        };
        table.push_row(Row::new(
            Styles::default(),
            vec![label.into(), cell(home), cell(away)],
        ));
    }

    let mut push = |label: &str, home: Cell, away: Cell| {
        table.push_row(Row::new(Styles::default(), vec![label.into(), home, away]));
    };
    push("Win%", pct(home.win_prob).into(), pct(away.win_prob).into());
    push("Supremacy", optional(home.supremacy, 1), optional(away.supremacy, 1));
    push("Spread", optional(home.spread, 1), optional(away.spread, 1));
    push("Moneyline", optional(home.moneyline, 3), optional(away.moneyline, 3));
    push(
        "Total",
        optional(summary.adjusted_total, 1),
        optional(summary.adjusted_total, 1),
    );
    push(
        "Possessions",
        format!("{:.1}", summary.possessions).into(),
        format!("{:.1}", summary.possessions).into(),
    );
    push("Tie%", pct(summary.tie_prob).into(), pct(summary.tie_prob).into());
    table
}

/// One row per player, in the order given.
pub fn tabulate_box_score(lines: &[BoxScoreLine]) -> Table {
    const HEADERS: [&str; 16] = [
        "Player", "Team", "Min", "2PM", "2PA", "2P%", "3PM", "3PA", "3P%", "FTM", "FTA", "FT%", "REB",
        "AST", "TO", "PTS",
    ];
    let mut table = Table::default()
        .with_cols(
            HEADERS
                .iter()
                .enumerate()
                .map(|(index, _)| {
                    if index < 2 {
                        Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Left))
                    } else {
                        Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Right))
                    }
                })
                .collect(),
        )
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            HEADERS.iter().map(|&header| header.into()).collect(),
        ));

    for line in lines {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                line.name.clone().into(),
                line.team.clone().into(),
                format!("{:.1}", line.minutes).into(),
                format!("{:.1}", line.two_made).into(),
                format!("{:.1}", line.two_attempts).into(),
                pct(line.two_pct).into(),
                format!("{:.1}", line.three_made).into(),
                format!("{:.1}", line.three_attempts).into(),
                pct(line.three_pct).into(),
                format!("{:.1}", line.ftm).into(),
                format!("{:.1}", line.fta).into(),
                pct(line.ft_pct).into(),
                format!("{:.1}", line.rebounds).into(),
                format!("{:.1}", line.assists).into(),
                format!("{:.1}", line.turnovers).into(),
                format!("{:.1}", line.points).into(),
            ],
        ));
    }
    table
}

/// Ranked ratings of `metric` on one side of the ball.
pub fn tabulate_leaders(role: Role, metric: Metric, profiles: &[&PlayerRatingProfile]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Rank".into(),
                "Player".into(),
                "Team".into(),
                format!("{metric} ({role})").into(),
                "Obs.".into(),
            ],
        ));
    for (rank, profile) in profiles.iter().enumerate() {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}", rank + 1).into(),
                profile.name.clone().into(),
                profile.team.clone().into(),
                format!("{:.2}", profile.ratings(role)[metric]).into(),
                format!("{}", profile.observations).into(),
            ],
        ));
    }
    table
}
