use cost_rollup::{
    CostReportProcessor, DatasetLoader, DrillDepth, HierarchyDepth, ReportConfig, RowLevel,
    YoyChange,
};
use std::error::Error;
use tokio::fs;

const COSTS: &str = "\u{feff}YYYYMM,BRD_CD,BRD_NM,CCTR_CD,CCTR_NM,CCTR_TYPE,CATEGORY_L1,CATEGORY_L2,CATEGORY_L3,GL_CD,GL_NM,COST_AMT
202410,M,MLB,F1001,영업팀,부서,인건비,인건비,급료와 임금,51100,급료,\"320,000,000\"
202410,M,MLB,Z2001,강남점,매장,인건비,인건비,급료와 임금,51100,급료,\"85,000,000\"
202410,M,MLB,F1001,영업팀,부서,인건비,인건비,퇴직급여,51200,퇴직급여,40000000
202410,M,MLB,F1002,마케팅팀,부서,광고선전비,광고,매체광고,52100,TV광고,150000000
202410,M,MLB,F1002,마케팅팀,부서,광고선전비,광고,매체광고,52110,디지털광고,90000000
202410,M,MLB,Z2001,강남점,매장,임차료,임차료,매장임차료,53100,임차료,210000000
202410,M,MLB,F1003,경영지원,부서,제간비,수수료,외주용역,54100,용역수수료,30000000
202410,M,MLB,F1003,경영지원,부서,공통비,배부,본사배부,59900,공통비배부,70000000
202310,M,MLB,F1001,영업팀,부서,인건비,인건비,급료와 임금,51100,급료,\"300,000,000\"
202310,M,MLB,F1001,영업팀,부서,인건비,인건비,퇴직급여,51200,퇴직급여,38000000
202310,M,MLB,F1002,마케팅팀,부서,광고선전비,광고,매체광고,52100,TV광고,180000000
202310,M,MLB,Z2001,강남점,매장,임차료,임차료,매장임차료,53100,임차료,200000000
202410,I,MLB KIDS,F3001,키즈영업,부서,인건비,인건비,급료와 임금,51100,급료,60000000
";

const SALES: &str = "YYYYMM,BRD_CD,BRD_NM,TOTAL_SALES
202410,M,MLB,9500000000
202310,M,MLB,8800000000
202410,I,MLB KIDS,1200000000
";

const HEADCOUNT: &str = "BRD_CD,YYYYMM,HEADCOUNT
M,202410,120
M,202310,112
I,202410,25
";

const STORES: &str = "BRD_CD,CHANNEL,STORE_CNT,YYYYMM
M,백화점,40,202410
M,아울렛,12,202410
M,온라인,3,202410
M,백화점,38,202310
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("🚀 Cost rollup demo\n");

    let dir = std::env::temp_dir().join("cost-rollup-demo");
    fs::create_dir_all(&dir).await?;
    fs::write(dir.join("costs.csv"), COSTS).await?;
    fs::write(dir.join("sales.csv"), SALES).await?;
    fs::write(dir.join("headcount.csv"), HEADCOUNT).await?;
    fs::write(dir.join("stores.csv"), STORES).await?;

    let config = ReportConfig::default();
    let dataset = DatasetLoader::new(config.clone()).load_dir(&dir).await;
    println!("📂 Sources: {:?}\n", dataset.data_source());

    let processor = CostReportProcessor::new(config)?.with_depth(HierarchyDepth::GlAccount);
    let report = processor.query_with_verification(&dataset, "M", "2024-10", "monthly", 1e-6)?;

    println!("📊 {} {} ({})", report.brand_code, report.target_month, report.mode);
    println!("{:<24} {:>8} {:>8} {:>8} {:>8}", "", "전년", "당년", "증감", "YoY");
    for row in &report.table.rows {
        let indent = match row.level {
            RowLevel::Total => 0,
            RowLevel::L1 => 2,
            RowLevel::L2 => 4,
            RowLevel::L3 => 6,
        };
        println!(
            "{:indent$}{:<width$} {:>8} {:>8} {:>+8} {:>8}",
            "",
            row.name,
            row.prior,
            row.current,
            row.diff,
            row.yoy.to_string(),
            indent = indent,
            width = 24 - indent
        );
    }
    if let Some(total) = report.table.total() {
        println!("\n📝 {}", total.description);
    }

    println!("\n📈 KPI");
    println!("   Total cost:        {} → {}", report.kpi.total_cost.prior, report.kpi.total_cost.current);
    if let YoyChange::PointDiff { points } = report.kpi.cost_ratio.change {
        println!("   Cost ratio:        {:.1}% ({:+.1}%p)", report.kpi.cost_ratio.current, points);
    }
    println!("   Cost per person:   {:.1}", report.kpi.cost_per_person.current);
    println!("   Cost per store:    {}", report.kpi.cost_per_store.current);
    println!("   Salary per person: {:.1}", report.kpi.salary_per_person.current);

    println!("\n🔍 Drill-down");
    let mut navigator = processor
        .navigator(&dataset, "M", "202410", "monthly")?
        .with_category_listener(|name| println!("   → category selected: {}", name));

    for step in ["인건비", "급료와 임금", "급료"] {
        let state = navigator.select(step).clone();
        println!("   select {:<10} depth {:?}", step, state.depth);
        for row in navigator.rows() {
            println!("      {:<14} {:>6} {:>6}", row.category, row.previous, row.current);
        }
    }

    while navigator.state().depth != DrillDepth::L1 {
        let depth = navigator.back().depth;
        println!("   back → {:?}", depth);
    }

    println!("\n🌐 All brands");
    for kpi in processor.overview(&dataset, "202410", "monthly")? {
        println!("   {:<16} {:>8}", kpi.brand_code, kpi.total_cost.current);
    }

    fs::remove_dir_all(&dir).await?;
    Ok(())
}
