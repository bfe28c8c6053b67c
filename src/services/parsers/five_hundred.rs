// src/services/parsers/five_hundred.rs

//! datachart.500.com history tables.
//!
//! Two layouts exist: SSQ and DLT render one ball per cell inside
//! `<tbody id="tdata">`; QLC and QXC render all numbers in a single cell of
//! the third table on the page.

use scraper::{ElementRef, Html, Selector};

use crate::models::{DrawRecord, GameKind};
use crate::services::parsers::{DrawParser, RowBuilder, split_numbers};
use crate::utils::http::clean_cell_text;

const SOURCE: &str = "500.com";

/// Parser for the page layout `game` uses.
pub fn five_hundred_parser(game: GameKind) -> Box<dyn DrawParser> {
    match game {
        GameKind::Ssq | GameKind::Dlt => Box::new(TdataParser::new(game)),
        GameKind::Qlc | GameKind::Qxc => Box::new(PlainTableParser::new(game)),
    }
}

fn cell_texts(row: ElementRef<'_>, cell: &Selector) -> Vec<String> {
    row.select(cell)
        .map(|td| clean_cell_text(&td.text().collect::<String>()))
        .collect()
}

fn parse_cells(cells: &[String]) -> Option<Vec<u8>> {
    cells.iter().map(|c| c.parse().ok()).collect()
}

/// One ball per cell: issue, primary zone, secondary zone, ..., date last.
pub struct TdataParser {
    game: GameKind,
}

impl TdataParser {
    /// Rows with fewer cells are summary or advert rows.
    const MIN_CELLS: usize = 10;

    pub fn new(game: GameKind) -> Self {
        Self { game }
    }

    fn parse_row(&self, cells: &[String], builder: &RowBuilder) -> Option<DrawRecord> {
        if cells.len() < Self::MIN_CELLS {
            return None;
        }
        let spec = self.game.spec();
        let primary_end = 1 + spec.primary.count;
        let secondary_end = primary_end + spec.secondary.map_or(0, |z| z.count);

        let primary = parse_cells(&cells[1..primary_end])?;
        let secondary = parse_cells(&cells[primary_end..secondary_end])?;
        let date = cells.last()?;
        builder.build(&cells[0], date, primary, secondary)
    }
}

impl DrawParser for TdataParser {
    fn game(&self) -> GameKind {
        self.game
    }

    fn parse(&self, payload: &str) -> Vec<DrawRecord> {
        let builder = RowBuilder::new(self.game, SOURCE);
        let (Ok(row_selector), Ok(cell_selector)) =
            (Selector::parse("tbody#tdata tr"), Selector::parse("td"))
        else {
            return Vec::new();
        };

        let document = Html::parse_document(payload);
        let records: Vec<DrawRecord> = document
            .select(&row_selector)
            .filter_map(|row| self.parse_row(&cell_texts(row, &cell_selector), &builder))
            .collect();

        if records.is_empty() {
            log::debug!("[{}] no {} rows in tdata table", SOURCE, self.game);
        }
        records
    }
}

/// All numbers in column 1 of the third table.
pub struct PlainTableParser {
    game: GameKind,
}

impl PlainTableParser {
    pub fn new(game: GameKind) -> Self {
        Self { game }
    }

    /// Digits per number when the page glues tokens together.
    fn token_width(&self) -> usize {
        match self.game {
            GameKind::Qxc => 1,
            _ => 2,
        }
    }

    fn date_column(&self) -> usize {
        match self.game {
            GameKind::Qxc => 4,
            _ => 5,
        }
    }

    fn parse_row(&self, cells: &[String], builder: &RowBuilder) -> Option<DrawRecord> {
        let date_column = self.date_column();
        if cells.len() <= date_column {
            return None;
        }
        let spec = self.game.spec();
        let numbers = split_numbers(&cells[1], self.token_width())?;
        let secondary_count = spec.secondary.map_or(0, |z| z.count);
        if numbers.len() != spec.primary.count + secondary_count {
            log::debug!(
                "[{}] {} row {} has {} numbers",
                SOURCE,
                self.game,
                cells[0],
                numbers.len()
            );
            return None;
        }
        let (primary, secondary) = numbers.split_at(spec.primary.count);
        builder.build(
            &cells[0],
            &cells[date_column],
            primary.to_vec(),
            secondary.to_vec(),
        )
    }
}

impl DrawParser for PlainTableParser {
    fn game(&self) -> GameKind {
        self.game
    }

    fn parse(&self, payload: &str) -> Vec<DrawRecord> {
        let builder = RowBuilder::new(self.game, SOURCE);
        let (Ok(table_selector), Ok(row_selector), Ok(cell_selector)) = (
            Selector::parse("table"),
            Selector::parse("tr"),
            Selector::parse("td"),
        ) else {
            return Vec::new();
        };

        let document = Html::parse_document(payload);
        let Some(table) = document.select(&table_selector).nth(2) else {
            log::debug!("[{}] {} page has fewer than three tables", SOURCE, self.game);
            return Vec::new();
        };

        // Header rows fail issue validation and drop out here.
        table
            .select(&row_selector)
            .filter_map(|row| self.parse_row(&cell_texts(row, &cell_selector), &builder))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSQ_PAGE: &str = r#"
        <html><body>
        <table>
          <thead><tr><td>Issue</td><td colspan="7">Balls</td></tr></thead>
          <tbody id="tdata">
            <tr class="t_tr1">
              <!--<td>2</td>-->
              <td>24138</td>
              <td class="t_cfont2">01</td><td class="t_cfont2">05</td><td class="t_cfont2">12</td>
              <td class="t_cfont2">20</td><td class="t_cfont2">28</td><td class="t_cfont2">33</td>
              <td class="t_cfont4">07</td>
              <td>&nbsp;</td>
              <td>1,234,567,890</td>
              <td>2024-12-01</td>
            </tr>
            <tr class="t_tr1">
              <td>24137</td>
              <td>03</td><td>08</td><td>14</td><td>22</td><td>27</td><td>31</td>
              <td>11</td>
              <td>&nbsp;</td>
              <td>1,111,111</td>
              <td>2024-11-28</td>
            </tr>
            <tr><td>24136</td><td>bad</td><td>row</td></tr>
            <tr>
              <td>24135</td>
              <td>03</td><td>08</td><td>14</td><td>22</td><td>27</td><td>31</td>
              <td>11</td>
              <td>&nbsp;</td>
              <td>1</td>
              <td>not a date</td>
            </tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn tdata_parses_ssq_rows_in_document_order() {
        let records = TdataParser::new(GameKind::Ssq).parse(SSQ_PAGE);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].issue.as_str(), "2024138");
        assert_eq!(records[0].balls.primary, vec![1, 5, 12, 20, 28, 33]);
        assert_eq!(records[0].balls.secondary, vec![7]);
        assert_eq!(records[1].issue.as_str(), "2024137");
        assert_eq!(records[1].draw_date.to_string(), "2024-11-28");
    }

    #[test]
    fn tdata_parses_dlt_two_back_balls() {
        let page = r#"
            <table><tbody id="tdata">
              <tr>
                <td>24140</td>
                <td>02</td><td>09</td><td>17</td><td>25</td><td>34</td>
                <td>03</td><td>11</td>
                <td>800,000,000</td><td>5</td><td>10,000,000</td>
                <td>2024-12-04</td>
              </tr>
            </tbody></table>
        "#;
        let records = TdataParser::new(GameKind::Dlt).parse(page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sorted_key, "02,09,17,25,34-03,11");
    }

    #[test]
    fn tdata_without_table_is_empty() {
        let parser = TdataParser::new(GameKind::Ssq);
        assert!(parser.parse("<html><body>maintenance</body></html>").is_empty());
        assert!(parser.parse("").is_empty());
    }

    fn plain_page(rows: &str) -> String {
        format!(
            r#"<html><body>
            <table><tr><td>nav</td></tr></table>
            <table><tr><td>filters</td></tr></table>
            <table>
              <tr><td>Issue</td><td>Numbers</td><td>a</td><td>b</td><td>c</td><td>Date</td></tr>
              {rows}
            </table>
            </body></html>"#
        )
    }

    #[test]
    fn plain_table_parses_qlc_with_glued_tokens() {
        let page = plain_page(
            r#"
            <tr><td>24140</td><td>04 09 15 20 23 25 2721</td><td>1</td><td>2</td><td>3</td><td>2024-12-02</td></tr>
            <tr><td>24139</td><td>01 02 03 04 05 06 07</td><td>1</td><td>2</td><td>3</td><td>2024-11-29</td></tr>
            <tr><td>2024138</td><td>02 06 11 15 19 24 30 08</td><td>1</td><td>2</td><td>3</td><td>2024-11-27</td></tr>
            "#,
        );
        let records = PlainTableParser::new(GameKind::Qlc).parse(&page);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].issue.as_str(), "2024140");
        assert_eq!(records[0].balls.primary, vec![4, 9, 15, 20, 23, 25, 27]);
        assert_eq!(records[0].balls.secondary, vec![21]);
        assert_eq!(records[1].issue.as_str(), "2024138");
    }

    #[test]
    fn plain_table_parses_qxc_digits() {
        let page = plain_page(
            r#"
            <tr><td>24141</td><td>1 2 3 4 5 6 7</td><td>x</td><td>y</td><td>2024-12-03</td></tr>
            <tr><td>24140</td><td>9 9 0 1 1 3 5</td><td>x</td><td>y</td><td>2024-12-01</td></tr>
            "#,
        );
        let records = PlainTableParser::new(GameKind::Qxc).parse(&page);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].balls.primary, vec![9, 9, 0, 1, 1, 3, 5]);
        assert!(records[1].balls.secondary.is_empty());
    }

    #[test]
    fn plain_table_needs_three_tables() {
        let page = "<table><tr><td>24140</td><td>1 2 3 4 5 6 7</td></tr></table>";
        assert!(PlainTableParser::new(GameKind::Qxc).parse(page).is_empty());
    }

    #[test]
    fn factory_picks_layout() {
        assert!(five_hundred_parser(GameKind::Ssq).parse(SSQ_PAGE).len() == 2);
        assert_eq!(five_hundred_parser(GameKind::Qxc).game(), GameKind::Qxc);
    }
}
